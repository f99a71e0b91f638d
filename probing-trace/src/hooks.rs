/// The six hook points a tracer can be invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PreForward,
    PostForward,
    PreBackward,
    PostBackward,
    PreStep,
    PostStep,
}

/// The timer's `(module_id, stage_group)` key collapses `pre_X`/`post_X`
/// into the same group, so a `pre_forward` begin pairs with the matching
/// `post_forward` end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageGroup {
    Forward,
    Backward,
    Step,
}

impl Stage {
    pub fn group(self) -> StageGroup {
        match self {
            Stage::PreForward | Stage::PostForward => StageGroup::Forward,
            Stage::PreBackward | Stage::PostBackward => StageGroup::Backward,
            Stage::PreStep | Stage::PostStep => StageGroup::Step,
        }
    }

    pub fn is_begin(self) -> bool {
        matches!(self, Stage::PreForward | Stage::PreBackward | Stage::PreStep)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::PreForward => "pre_forward",
            Stage::PostForward => "post_forward",
            Stage::PreBackward => "pre_backward",
            Stage::PostBackward => "post_backward",
            Stage::PreStep => "pre_step",
            Stage::PostStep => "post_step",
        }
    }
}
