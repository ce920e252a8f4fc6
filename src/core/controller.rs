use crate::core::validation::ValidationGate;
use crate::domain::model::{
    FieldError, ItemId, WizardState, CONFIRMATION_STEP, IDENTITY_STEP, MAX_STEP, PLAN_STEP,
    SUMMARY_STEP,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advance,
    Retreat,
    JumpToPlanStep,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Moved { from: usize, to: usize },
    /// Validation failed; the step did not change.
    Blocked { errors: Vec<FieldError> },
    /// The transition is not available from the current step.
    Ignored,
}

pub struct StepController;

impl StepController {
    pub fn permits(state: &WizardState, transition: Transition) -> bool {
        match transition {
            Transition::Advance => state.current_step < MAX_STEP,
            Transition::Retreat => state.current_step > IDENTITY_STEP,
            Transition::JumpToPlanStep => true,
            Transition::Confirm => state.current_step == SUMMARY_STEP,
        }
    }

    /// Runs `transition` against `state`. Callers go through the state store.
    pub fn apply(state: &mut WizardState, transition: Transition) -> StepOutcome {
        if !Self::permits(state, transition) {
            return StepOutcome::Ignored;
        }

        let from = state.current_step;
        let to = match transition {
            Transition::Advance => {
                if from == IDENTITY_STEP {
                    let errors = ValidationGate::check(&state.draft);
                    state.field_errors = errors.clone();
                    if !errors.is_empty() {
                        return StepOutcome::Blocked { errors };
                    }
                    state.form.identity = state.draft.clone();
                }
                from + 1
            }
            Transition::Retreat => from - 1,
            Transition::JumpToPlanStep => PLAN_STEP,
            Transition::Confirm => CONFIRMATION_STEP,
        };

        state.current_step = to;
        StepOutcome::Moved { from, to }
    }

    pub fn select_plan(state: &mut WizardState, plan: ItemId) {
        state.form.plan = plan;
    }

    /// Adds `addon` if absent, removes it if present. Returns whether it is now selected.
    pub fn toggle_addon(state: &mut WizardState, addon: &ItemId) -> bool {
        let addons = &mut state.form.addons;
        match addons.iter().position(|a| a == addon) {
            Some(index) => {
                addons.remove(index);
                false
            }
            None => {
                addons.push(addon.clone());
                true
            }
        }
    }
}
