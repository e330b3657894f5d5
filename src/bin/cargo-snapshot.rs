#![forbid(unsafe_code)]

use cargo_snapshot::{
    apple::{cli::Input, NAME},
    util::cli::exec,
};

fn main() {
    exec::<Input>(NAME)
}
