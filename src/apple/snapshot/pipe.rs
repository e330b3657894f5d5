use crate::util::{self, ShellEscapeError};
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub static LOG_STAGE: &str = "tee";
pub static FORMATTER: &str = "xcpretty";
static APPEND_FLAG: &str = "-a";

#[derive(Debug, Error)]
pub enum PipeError {
    #[error("Log path {path:?} isn't valid UTF-8.")]
    LogPathInvalidUtf8 { path: PathBuf },
    #[error("Log path {path:?} can't be passed to `tee`: {source}")]
    LogPathUnquotable {
        path: PathBuf,
        source: ShellEscapeError,
    },
}

/// Builds `| tee [-a] [log path] | xcpretty <args>`.
///
/// An existing log file is appended to rather than truncated. `xcpretty_args`
/// is operator-supplied and passed through verbatim. `language` and `locale`
/// don't affect the output stages.
pub fn pipe(
    _language: Option<&str>,
    _locale: Option<&str>,
    log_path: Option<&Path>,
    xcpretty_args: &str,
) -> Result<String, PipeError> {
    let mut tee = vec![Cow::Borrowed(LOG_STAGE)];
    if let Some(log_path) = log_path {
        if log_path.exists() {
            log::info!("appending to existing log file {:?}", log_path);
            tee.push(Cow::Borrowed(APPEND_FLAG));
        }
        let raw = log_path
            .to_str()
            .ok_or_else(|| PipeError::LogPathInvalidUtf8 {
                path: log_path.to_owned(),
            })?;
        tee.push(
            util::shell_escape(raw).map_err(|source| PipeError::LogPathUnquotable {
                path: log_path.to_owned(),
                source,
            })?,
        );
    }
    let formatter = if xcpretty_args.trim().is_empty() {
        FORMATTER.to_owned()
    } else {
        format!("{} {}", FORMATTER, xcpretty_args)
    };
    Ok(format!("| {} | {}", tee.join(" "), formatter))
}
