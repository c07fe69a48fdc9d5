//! Tutor workflow: one learner's state and the transitions that move it.
//!
//! `WorkflowState::reduce` is a pure function from (state, action) to the next state
//! plus at most one gateway effect. `Session` drives it: it reduces under its lock,
//! runs the effect with the lock released, then reduces the outcome back in. While a
//! call is in flight the state is busy, so a second generate/submit is rejected by
//! the reducer rather than queued.
//!
//! States: `Idle` -> `GeneratingExercise` -> `Idle`, and `Idle` -> `Evaluating` -> `Idle`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::domain::{Difficulty, EvaluationResult, Exercise, Topic};
use crate::error::TutorError;
use crate::gateway::{ContentModel, Gateway};
use crate::locale::{MSG_EVALUATION_FAILED, MSG_GENERATION_FAILED, MSG_MISSING_API_KEY};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    GeneratingExercise,
    Evaluating,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkflowState {
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub exercise: Option<Exercise>,
    /// The learner's code buffer; seeded with the starter code on each new exercise.
    pub code: String,
    pub evaluation: Option<EvaluationResult>,
    pub hints_revealed: usize,
    pub status: Status,
    pub last_error: Option<String>,
}

/// What the learner asked for. Also the wire format of an intent.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    SelectTopic { topic: Topic },
    SelectDifficulty { difficulty: Difficulty },
    RequestGeneration,
    EditCode { code: String },
    Submit,
    RevealHint,
}

#[derive(Debug)]
pub enum Action {
    User(Intent),
    ExerciseGenerated(Result<Exercise, TutorError>),
    SubmissionEvaluated(Result<EvaluationResult, TutorError>),
}

/// A gateway call the reducer wants performed. Carries its own copies of the inputs,
/// so later edits never affect a call already issued.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    GenerateExercise { topic: Topic, difficulty: Difficulty },
    EvaluateSubmission { exercise: Exercise, code: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Ignored,
}

#[derive(Clone, Copy, Debug)]
pub struct Capabilities {
    pub credential_present: bool,
}

#[derive(Debug)]
pub struct Transition {
    pub state: WorkflowState,
    pub effect: Option<Effect>,
    pub outcome: Outcome,
}

impl Transition {
    fn applied(state: WorkflowState) -> Self {
        Self { state, effect: None, outcome: Outcome::Applied }
    }

    fn ignored(state: WorkflowState) -> Self {
        Self { state, effect: None, outcome: Outcome::Ignored }
    }
}

impl WorkflowState {
    pub fn is_idle(&self) -> bool {
        self.status == Status::Idle
    }

    pub fn hint_count(&self) -> usize {
        self.exercise.as_ref().map_or(0, |e| e.hints.len())
    }

    /// Hints the learner has unlocked so far, in order.
    pub fn revealed_hints(&self) -> &[String] {
        match &self.exercise {
            Some(e) => &e.hints[..self.hints_revealed.min(e.hints.len())],
            None => &[],
        }
    }

    pub fn reduce(self, action: Action, caps: Capabilities) -> Transition {
        match action {
            Action::User(intent) => self.on_intent(intent, caps),
            Action::ExerciseGenerated(result) => self.on_generated(result),
            Action::SubmissionEvaluated(result) => self.on_evaluated(result),
        }
    }

    fn on_intent(mut self, intent: Intent, caps: Capabilities) -> Transition {
        match intent {
            Intent::SelectTopic { topic } => {
                self.topic = topic;
                Transition::applied(self)
            }
            Intent::SelectDifficulty { difficulty } => {
                self.difficulty = difficulty;
                Transition::applied(self)
            }
            Intent::RequestGeneration => {
                if !self.is_idle() {
                    return Transition::ignored(self);
                }
                if !caps.credential_present {
                    self.last_error = Some(MSG_MISSING_API_KEY.to_string());
                    return Transition::applied(self);
                }
                self.last_error = None;
                self.evaluation = None;
                self.hints_revealed = 0;
                self.status = Status::GeneratingExercise;
                let effect = Effect::GenerateExercise { topic: self.topic, difficulty: self.difficulty };
                Transition { state: self, effect: Some(effect), outcome: Outcome::Applied }
            }
            Intent::EditCode { code } => {
                // The buffer is overwritten by the starter code when generation lands.
                if self.exercise.is_none() || self.status == Status::GeneratingExercise {
                    return Transition::ignored(self);
                }
                self.code = code;
                Transition::applied(self)
            }
            Intent::Submit => {
                let Some(exercise) = self.exercise.clone().filter(|_| self.is_idle()) else {
                    return Transition::ignored(self);
                };
                self.last_error = None;
                self.status = Status::Evaluating;
                let effect = Effect::EvaluateSubmission { exercise, code: self.code.clone() };
                Transition { state: self, effect: Some(effect), outcome: Outcome::Applied }
            }
            Intent::RevealHint => {
                if self.hints_revealed >= self.hint_count() {
                    return Transition::ignored(self);
                }
                self.hints_revealed += 1;
                Transition::applied(self)
            }
        }
    }

    fn on_generated(mut self, result: Result<Exercise, TutorError>) -> Transition {
        if self.status != Status::GeneratingExercise {
            return Transition::ignored(self);
        }
        match result {
            Ok(exercise) => {
                self.code = exercise.starter_code.clone();
                self.exercise = Some(exercise);
                self.hints_revealed = 0;
                self.evaluation = None;
            }
            Err(_) => self.last_error = Some(MSG_GENERATION_FAILED.to_string()),
        }
        self.status = Status::Idle;
        Transition::applied(self)
    }

    fn on_evaluated(mut self, result: Result<EvaluationResult, TutorError>) -> Transition {
        if self.status != Status::Evaluating {
            return Transition::ignored(self);
        }
        match result {
            Ok(evaluation) => self.evaluation = Some(evaluation),
            Err(_) => self.last_error = Some(MSG_EVALUATION_FAILED.to_string()),
        }
        self.status = Status::Idle;
        Transition::applied(self)
    }
}

/// First half of a dispatch: the intent has been reduced, and `effect` (if any) still
/// has to be run through `Session::complete`.
#[derive(Debug)]
pub struct Begun {
    pub outcome: Outcome,
    pub state: WorkflowState,
    pub effect: Option<Effect>,
}

/// One learner's workflow, shared between the transport handler and in-flight calls.
pub struct Session<M> {
    state: Mutex<WorkflowState>,
    gateway: Arc<Gateway<M>>,
}

impl<M: ContentModel> Session<M> {
    pub fn new(gateway: Arc<Gateway<M>>) -> Self {
        Self { state: Mutex::new(WorkflowState::default()), gateway }
    }

    pub async fn snapshot(&self) -> WorkflowState {
        self.state.lock().await.clone()
    }

    async fn apply(&self, action: Action) -> Transition {
        let caps = Capabilities { credential_present: self.gateway.is_configured() };
        let mut guard = self.state.lock().await;
        let current = std::mem::take(&mut *guard);
        let transition = current.reduce(action, caps);
        *guard = transition.state.clone();
        transition
    }

    /// Reduce a user intent. Never touches the network.
    #[instrument(level = "debug", skip_all)]
    pub async fn begin(&self, intent: Intent) -> Begun {
        let t = self.apply(Action::User(intent)).await;
        debug!(target: "tutor", outcome = ?t.outcome, status = ?t.state.status, has_effect = t.effect.is_some(), "Intent reduced");
        Begun { outcome: t.outcome, state: t.state, effect: t.effect }
    }

    /// Run an effect through the gateway (lock released) and reduce its outcome.
    #[instrument(level = "info", skip(self, effect))]
    pub async fn complete(&self, effect: Effect) -> WorkflowState {
        let action = match effect {
            Effect::GenerateExercise { topic, difficulty } => {
                Action::ExerciseGenerated(self.gateway.generate_exercise(topic, difficulty).await)
            }
            Effect::EvaluateSubmission { exercise, code } => {
                Action::SubmissionEvaluated(self.gateway.evaluate_submission(&exercise, &code).await)
            }
        };
        let t = self.apply(action).await;
        info!(
            target: "tutor",
            status = ?t.state.status,
            has_exercise = t.state.exercise.is_some(),
            has_evaluation = t.state.evaluation.is_some(),
            failed = t.state.last_error.is_some(),
            "Gateway effect completed"
        );
        t.state
    }

}

impl<M: ContentModel + 'static> Session<M> {
    /// Run `complete` on its own task. The call and the return to `Idle` happen even
    /// if whoever issued the intent stops waiting.
    pub fn spawn_complete(self: &Arc<Self>, effect: Effect) -> JoinHandle<WorkflowState> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.complete(effect).await })
    }

    /// `begin` + `complete`: returns the state after any gateway call has finished.
    pub async fn dispatch(self: &Arc<Self>, intent: Intent) -> (Outcome, WorkflowState) {
        let begun = self.begin(intent).await;
        let Some(effect) = begun.effect else {
            return (begun.outcome, begun.state);
        };
        match self.spawn_complete(effect).await {
            Ok(state) => (begun.outcome, state),
            Err(e) => {
                error!(target: "tutor", error = %e, "Gateway effect task failed");
                (begun.outcome, self.snapshot().await)
            }
        }
    }
}
