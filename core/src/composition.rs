//! Reducer composition utilities
//!
//! An application is built from several domain reducers, each with its own
//! state and action type. The app-level reducer routes an app action to the
//! matching domain reducer and lifts the returned effects back into the app
//! action type with [`lift_effects`].
//!
//! # Example
//!
//! ```
//! use catalog_sync_core::composition::lift_effects;
//! use catalog_sync_core::effect::Effect;
//! use catalog_sync_core::{smallvec, SmallVec};
//!
//! #[derive(Debug)]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! #[derive(Debug)]
//! enum AppAction {
//!     Counter(CounterAction),
//! }
//!
//! let local: SmallVec<[Effect<CounterAction>; 4]> = smallvec![Effect::None];
//! let lifted = lift_effects(local, AppAction::Counter);
//! assert_eq!(lifted.len(), 1);
//! ```

use crate::effect::Effect;
use smallvec::SmallVec;

/// Lift every effect produced by a domain reducer into a parent action type.
///
/// `embed` wraps each action an effect eventually produces, usually an enum
/// variant constructor such as `AppAction::Catalog`.
#[must_use]
pub fn lift_effects<A, B, F>(
    effects: SmallVec<[Effect<A>; 4]>,
    embed: F,
) -> SmallVec<[Effect<B>; 4]>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> B + Clone + Send + Sync + 'static,
{
    effects
        .into_iter()
        .map(|effect| effect.map(embed.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::reducer::Reducer;
    use crate::smallvec;

    #[derive(Clone, Debug, Default)]
    struct SubState {
        value: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum SubAction {
        Add(i32),
        Added(i32),
    }

    #[derive(Clone, Debug, PartialEq)]
    enum ParentAction {
        Sub(SubAction),
    }

    struct SubReducer;

    impl Reducer for SubReducer {
        type State = SubState;
        type Action = SubAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                SubAction::Add(n) => {
                    state.value += n;
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(SubAction::Added(n))
                    }))]
                },
                SubAction::Added(_) => smallvec![Effect::None],
            }
        }
    }

    #[test]
    fn test_lift_effects_wraps_feedback_actions() {
        let mut state = SubState::default();
        let effects = SubReducer.reduce(&mut state, SubAction::Add(3), &());
        assert_eq!(state.value, 3);

        let mut lifted = lift_effects(effects, ParentAction::Sub);
        assert_eq!(lifted.len(), 1);

        let Some(Effect::Future(fut)) = lifted.pop() else {
            panic!("expected a single future effect");
        };
        assert_eq!(
            tokio_test::block_on(fut),
            Some(ParentAction::Sub(SubAction::Added(3)))
        );
    }

    #[test]
    fn test_lift_effects_keeps_noops() {
        let mut state = SubState::default();
        let effects = SubReducer.reduce(&mut state, SubAction::Added(1), &());
        let lifted = lift_effects(effects, ParentAction::Sub);
        assert!(lifted.iter().all(Effect::is_none));
    }
}
