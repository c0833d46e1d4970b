//! Outermost fault boundary.
//!
//! Turns a panic anywhere inside the guarded future into
//! [`ReleaseError::Panic`], carrying the backtrace captured at the panic site,
//! so it is reported through the same path as any other error.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Once;

use futures_lite::FutureExt;

use crate::error::{ReleaseError, Result};

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Panics inside a guarded poll record a backtrace and stay quiet; all
/// others go to the previously installed hook.
fn install_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) > 0 {
                let backtrace = Backtrace::force_capture().to_string();
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
                log::debug!("caught {info}");
            } else {
                previous(info);
            }
        }));
    });
}

struct GuardScope;

impl GuardScope {
    fn enter() -> Self {
        GUARD_DEPTH.with(|d| d.set(d.get() + 1));
        GuardScope
    }
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Render a panic payload as text
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `future`, converting a panic into [`ReleaseError::Panic`]
pub async fn catch_faults<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    install_hook();

    let mut future = Box::pin(future);
    let guarded = std::future::poll_fn(move |cx| {
        let _scope = GuardScope::enter();
        Future::poll(future.as_mut(), cx)
    });

    match AssertUnwindSafe(guarded).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(ReleaseError::Panic {
            message: panic_message(payload.as_ref()),
            backtrace: LAST_BACKTRACE
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_results_through() {
        assert_eq!(catch_faults(async { Ok(3) }).await.unwrap(), 3);
        assert!(matches!(
            catch_faults(async { Err::<(), _>(ReleaseError::Cancelled) }).await,
            Err(ReleaseError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn converts_panic_with_backtrace() {
        let err = catch_faults(async {
            tokio::task::yield_now().await;
            let items: Vec<u8> = Vec::new();
            if items.is_empty() {
                panic!("index out of range in test");
            }
            Ok(())
        })
        .await
        .unwrap_err();

        match err {
            ReleaseError::Panic { message, backtrace } => {
                assert_eq!(message, "index out of range in test");
                assert!(!backtrace.is_empty());
            }
            other => panic!("expected panic error, got {other:?}"),
        }
    }

    #[test]
    fn formats_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u32), "unknown panic payload");
    }
}
