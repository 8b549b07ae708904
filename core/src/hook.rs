//! Observable request state around a single facade operation.
//!
//! # Design
//! An `ApiHook` owns one `RequestState` published through a
//! `tokio::sync::watch` channel, so any number of watchers can follow
//! `loading`/`data`/`error` as they change. `execute` supersedes whatever call
//! is still in flight: the previous call's future is aborted through its
//! `AbortHandle`, and every call carries a generation number that must still
//! be current when it settles. Only the most recently started call commits.
//!
//! There is no timeout. A call whose transport never settles leaves the hook
//! loading until a newer `execute` replaces it.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{self, AbortHandle, Abortable, BoxFuture};
use futures_util::FutureExt;
use tokio::sync::watch;

use crate::envelope::ApiResponse;

/// Fallback for error envelopes that carry an empty message.
pub const OPERATION_FAILED: &str = "Operation failed";
/// Fallback for operations that panic without a printable payload.
pub const UNKNOWN_FAILURE: &str = "An error occurred";

/// Snapshot of a hook's state.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> RequestState<T> {
    fn idle(data: Option<T>) -> Self {
        Self {
            data,
            loading: false,
            error: None,
        }
    }
}

type Operation<A, T> = dyn Fn(A) -> BoxFuture<'static, ApiResponse<T>> + Send + Sync;

struct InFlight {
    generation: u64,
    abort: Option<AbortHandle>,
}

struct Shared<A, T> {
    operation: Box<Operation<A, T>>,
    initial: Option<T>,
    state: watch::Sender<RequestState<T>>,
    in_flight: Mutex<InFlight>,
}

/// Reusable `{data, loading, error}` binding for one operation.
///
/// Cloning yields another handle onto the same state.
pub struct ApiHook<A, T> {
    shared: Arc<Shared<A, T>>,
}

impl<A, T> Clone for ApiHook<A, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A, T> ApiHook<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(operation: F, initial: Option<T>) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResponse<T>> + Send + 'static,
    {
        let operation: Box<Operation<A, T>> = Box::new(move |args| operation(args).boxed());
        let (state, _) = watch::channel(RequestState::idle(initial.clone()));
        Self {
            shared: Arc::new(Shared {
                operation,
                initial,
                state,
                in_flight: Mutex::new(InFlight {
                    generation: 0,
                    abort: None,
                }),
            }),
        }
    }

    /// Start the operation with `args`.
    ///
    /// The hook is already loading when this returns; the call itself runs
    /// when the returned future is polled. Resolves to the envelope, or
    /// `None` when the operation panicked or was superseded before settling.
    /// Dropping the future unpolled leaves the hook loading until the next
    /// `execute`.
    pub fn execute(&self, args: A) -> impl Future<Output = Option<ApiResponse<T>>> + Send + 'static {
        let (abort, registration) = AbortHandle::new_pair();
        let generation = {
            let mut in_flight = lock(&self.shared.in_flight);
            if let Some(previous) = in_flight.abort.replace(abort) {
                previous.abort();
            }
            in_flight.generation += 1;
            self.shared.state.send_modify(|state| {
                state.loading = true;
                state.error = None;
            });
            in_flight.generation
        };

        let started =
            std::panic::catch_unwind(AssertUnwindSafe(|| (self.shared.operation)(args)));
        let pending = match started {
            Ok(pending) => pending,
            Err(panic) => {
                let settled = self.shared.settle(generation, Err(panic));
                return future::ready(settled).left_future();
            }
        };

        let call = Abortable::new(AssertUnwindSafe(pending).catch_unwind(), registration);
        let shared = Arc::clone(&self.shared);
        async move {
            match call.await {
                Ok(outcome) => shared.settle(generation, outcome),
                Err(_aborted) => {
                    tracing::debug!(generation, "superseded call aborted");
                    None
                }
            }
        }
        .right_future()
    }

    /// Back to the initial state. An in-flight call is not cancelled.
    pub fn reset(&self) {
        let initial = self.shared.initial.clone();
        self.shared
            .state
            .send_replace(RequestState::idle(initial));
    }

    /// Override `data` without touching `loading` or `error`.
    pub fn set_data(&self, data: T) {
        self.shared.state.send_modify(|state| state.data = Some(data));
    }

    pub fn state(&self) -> RequestState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.shared.state.borrow().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.shared.state.borrow().error.clone()
    }

    /// Watch every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.shared.state.subscribe()
    }
}

impl<A, T: Clone> Shared<A, T> {
    fn settle(
        &self,
        generation: u64,
        outcome: Result<ApiResponse<T>, Box<dyn Any + Send>>,
    ) -> Option<ApiResponse<T>> {
        let mut in_flight = lock(&self.in_flight);
        let current = in_flight.generation == generation;
        if current {
            in_flight.abort = None;
        } else {
            tracing::debug!(generation, latest = in_flight.generation, "discarding superseded result");
        }

        match outcome {
            Ok(response) => {
                if current {
                    self.state.send_modify(|state| {
                        state.loading = false;
                        match &response {
                            ApiResponse::Success { data, .. } => {
                                state.data = data.clone();
                                state.error = None;
                            }
                            ApiResponse::Error { error } if error.is_empty() => {
                                state.error = Some(OPERATION_FAILED.to_string());
                            }
                            ApiResponse::Error { error } => {
                                state.error = Some(error.clone());
                            }
                        }
                    });
                }
                Some(response)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!(generation, error = %message, "operation panicked");
                if current {
                    self.state.send_modify(|state| {
                        state.loading = false;
                        state.error = Some(message);
                    });
                }
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        UNKNOWN_FAILURE.to_string()
    }
}

fn lock(in_flight: &Mutex<InFlight>) -> MutexGuard<'_, InFlight> {
    in_flight
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Resolves `(delay_ms, value)` to `value` after the delay.
    fn delayed() -> ApiHook<(u64, &'static str), String> {
        ApiHook::new(
            |(delay, value): (u64, &'static str)| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                ApiResponse::success(value.to_string())
            },
            None,
        )
    }

    #[tokio::test]
    async fn loading_is_set_before_the_call_runs() {
        let hook = delayed();
        assert_eq!(hook.state(), RequestState::idle(None));

        let call = hook.execute((5, "A"));
        assert!(hook.is_loading());
        assert_eq!(hook.error(), None);

        let response = call.await;
        assert_eq!(response, Some(ApiResponse::success("A".to_string())));
        assert_eq!(
            hook.state(),
            RequestState {
                data: Some("A".to_string()),
                loading: false,
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn later_execute_wins_over_slower_earlier_one() {
        let hook = delayed();
        let first = hook.execute((100, "A"));
        let second = hook.execute((10, "B"));

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, None);
        assert_eq!(second, Some(ApiResponse::success("B".to_string())));
        assert_eq!(hook.data().as_deref(), Some("B"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(hook.data().as_deref(), Some("B"));
        assert!(!hook.is_loading());
    }

    #[tokio::test]
    async fn spawned_superseded_call_never_commits() {
        let hook = delayed();
        let first = tokio::spawn(hook.execute((80, "A")));
        tokio::time::sleep(Duration::from_millis(5)).await;

        let second = hook.execute((10, "B")).await;
        assert!(second.is_some());
        assert_eq!(first.await.unwrap(), None);
        assert_eq!(hook.data().as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn error_keeps_previous_data() {
        let hook: ApiHook<bool, i32> = ApiHook::new(
            |fail: bool| async move {
                if fail {
                    ApiResponse::error("Branch not found")
                } else {
                    ApiResponse::success(7)
                }
            },
            None,
        );
        hook.execute(false).await;
        let response = hook.execute(true).await;

        assert_eq!(response, Some(ApiResponse::error("Branch not found")));
        assert_eq!(
            hook.state(),
            RequestState {
                data: Some(7),
                loading: false,
                error: Some("Branch not found".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn empty_error_message_gets_fallback() {
        let hook: ApiHook<(), i32> = ApiHook::new(|()| async { ApiResponse::error("") }, None);
        hook.execute(()).await;
        assert_eq!(hook.error().as_deref(), Some(OPERATION_FAILED));
    }

    #[tokio::test]
    async fn success_without_data_clears_data() {
        let hook: ApiHook<(), i32> = ApiHook::new(
            |()| async {
                ApiResponse::Success {
                    data: None,
                    message: Some("deleted".to_string()),
                }
            },
            Some(1),
        );
        hook.execute(()).await;
        assert_eq!(hook.data(), None);
        assert_eq!(hook.error(), None);
    }

    #[tokio::test]
    async fn panicking_operation_becomes_error_state() {
        let hook: ApiHook<bool, i32> = ApiHook::new(
            |explode: bool| async move {
                if explode {
                    panic!("decoder exploded");
                }
                ApiResponse::success(0)
            },
            Some(3),
        );
        let response = hook.execute(true).await;
        assert_eq!(response, None);
        assert_eq!(
            hook.state(),
            RequestState {
                data: Some(3),
                loading: false,
                error: Some("decoder exploded".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn panic_while_starting_the_call_becomes_error_state() {
        let hook: ApiHook<usize, i32> = ApiHook::new(
            |index: usize| {
                let value = vec![1, 2][index];
                async move { ApiResponse::success(value) }
            },
            None,
        );

        let response = hook.execute(5).await;
        assert_eq!(response, None);
        let state = hook.state();
        assert!(!state.loading);
        assert_eq!(state.data, None);
        assert!(state.error.unwrap().starts_with("index out of bounds"));

        assert_eq!(hook.execute(1).await, Some(ApiResponse::success(2)));
        assert_eq!(hook.state(), RequestState::idle(Some(2)));
    }

    #[tokio::test]
    async fn reset_restores_initial_data() {
        let hook: ApiHook<i32, i32> =
            ApiHook::new(|n: i32| async move { ApiResponse::success(n) }, Some(0));
        hook.execute(42).await;
        hook.set_data(43);
        assert_eq!(hook.data(), Some(43));

        hook.reset();
        assert_eq!(hook.state(), RequestState::idle(Some(0)));
    }

    #[tokio::test]
    async fn set_data_leaves_loading_and_error_alone() {
        let hook: ApiHook<(), i32> = ApiHook::new(|()| async { ApiResponse::error("down") }, None);
        hook.execute(()).await;
        hook.set_data(5);
        assert_eq!(
            hook.state(),
            RequestState {
                data: Some(5),
                loading: false,
                error: Some("down".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn subscribers_see_the_settled_state() {
        let hook = delayed();
        let mut rx = hook.subscribe();

        let call = hook.execute((5, "A"));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().loading);

        call.await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().data.as_deref(), Some("A"));
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let owned: Box<dyn Any + Send> = Box::new("owned".to_string());
        let opaque: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(opaque.as_ref()), UNKNOWN_FAILURE);
    }
}
