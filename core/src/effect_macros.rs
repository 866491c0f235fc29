//! Declarative macros for ergonomic effect construction
//!
//! Reducers build most of their effects from an async block that calls a
//! remote service and maps the result to a settle action.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use catalog_sync_core::async_effect;
///
/// async_effect! {
///     match catalog.list_products().await {
///         Ok(items) => Some(CatalogAction::FetchSucceeded { request_id, items }),
///         Err(error) => Some(CatalogAction::FetchFailed { request_id, error: error.into() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Loaded { count: usize },
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::Loaded { count: 3 })
        };

        let Effect::Future(fut) = effect else {
            unreachable!("async_effect! always builds a future");
        };
        assert_eq!(
            tokio_test::block_on(fut),
            Some(TestAction::Loaded { count: 3 })
        );
    }
}
