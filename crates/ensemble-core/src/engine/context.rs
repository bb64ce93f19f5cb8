use super::config::AlignmentConfig;
use super::progress::ProgressReporter;
use super::superposition::Superposer;

/// Shared, read-only inputs of the alignment tasks.
#[derive(Clone, Copy)]
pub struct AlignmentContext<'a> {
    pub superposer: &'a dyn Superposer,
    pub config: &'a AlignmentConfig,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> AlignmentContext<'a> {
    pub fn new(
        superposer: &'a dyn Superposer,
        config: &'a AlignmentConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            superposer,
            config,
            reporter,
        }
    }
}
