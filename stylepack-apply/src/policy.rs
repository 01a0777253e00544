use stylepack_types::apply::StepRecord;

/// Decides whether to continue after a failed high-risk step.
pub trait ContinuePolicy {
    fn continue_after(&self, failed: &StepRecord) -> bool;
}

/// Stops on the first high-risk failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineContinue;

impl ContinuePolicy for DeclineContinue {
    fn continue_after(&self, _failed: &StepRecord) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl ContinuePolicy for AlwaysContinue {
    fn continue_after(&self, _failed: &StepRecord) -> bool {
        true
    }
}
