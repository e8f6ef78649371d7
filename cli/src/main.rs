//! TrendLab CLI — process entry point for `trendlab-runner`.
//!
//! Argument parsing, config-file loading, and report rendering are out of
//! scope for this workspace (external collaborators); this crate exists to
//! keep the three-crate workspace shape a real embedding application would
//! build its own entry point on top of.

fn main() {
    println!("TrendLab CLI — entry point only; wire up argument parsing, config loading, and reporting here");
}
