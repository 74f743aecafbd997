/// Where a [`ReflexionRun`](super::ReflexionRun) is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The responder has not drafted an answer yet.
    #[default]
    Draft,
    /// The searches of the last answer are due.
    ExecuteTools,
    /// A revision is due.
    Revise,
    /// The run is over.
    Terminated,
}

impl Stage {
    /// Decides where to go after a revision.
    ///
    /// Terminates once the completed cycles exceed `max_iterations`.
    pub(super) fn after_revision(
        tool_cycles_completed: usize,
        max_iterations: usize,
    ) -> Stage {
        if tool_cycles_completed > max_iterations {
            Stage::Terminated
        } else {
            Stage::ExecuteTools
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_revision() {
        assert_eq!(Stage::after_revision(1, 0), Stage::Terminated);
        assert_eq!(Stage::after_revision(1, 2), Stage::ExecuteTools);
        assert_eq!(Stage::after_revision(2, 2), Stage::ExecuteTools);
        assert_eq!(Stage::after_revision(3, 2), Stage::Terminated);
    }
}
