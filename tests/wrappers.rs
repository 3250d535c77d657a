//! Wrappers generated by the root build script from `tests/fixtures/api.rs`
//! and included next to the annotated code. Exercises the attribute macros,
//! the generator and the facade re-exports together.

#[path = "fixtures/api.rs"]
mod api;

use std::time::Duration;

use api::{Cache, CatalogRecast, CountingSession, FlatCatalog, SessionRecast, User, UserRepository};

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn test_sync_wrapper_returns_value() {
    let user = api::get_user_sync("7".to_string());
    assert_eq!(user.id, "7");
    assert_eq!(user.name.as_deref(), Some("name-7"));
}

#[test]
fn test_not_null_wrapper_forwards_some() {
    let user = api::rename_sync("3".to_string(), "Ada".to_string());
    assert_eq!(
        user,
        User {
            id: "3".to_string(),
            name: Some("Ada".to_string())
        }
    );
}

#[test]
fn test_member_suffix_override() {
    let repository = UserRepository::default();
    assert_eq!(repository.insert_blocking(1, "ada".to_string()), 1);
    assert_eq!(repository.insert_blocking(2, "grace".to_string()), 2);
    assert_eq!(repository.count(), 2);
}

#[test]
fn test_generic_function_blocking_wrapper() {
    assert_eq!(api::first_sync(vec![3_u8, 4]), Some(3));
    assert_eq!(api::first_sync(Vec::<String>::new()), None);
}

#[test]
fn test_generic_impl_blocking_wrappers() {
    let cache = Cache::new();
    assert_eq!(cache.push_sync("a".to_string()), 1);
    assert_eq!(cache.push_sync("b".to_string()), 2);
    assert_eq!(cache.snapshot_sync(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_trait_by_value_receiver_wrapper() {
    let session = CountingSession { requests: 5 };
    assert_eq!(session.close_sync(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_wrapper_inside_runtime() {
    let user = api::get_user_sync("8".to_string());
    assert_eq!(user.id, "8");
}

#[cfg(not(feature = "isolated"))]
mod shared_model {
    use super::*;
    use std::sync::mpsc;

    use recast::{Result, Scope};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scoped_wrapper_delivers_on_current_runtime() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let _job = api::get_user_async("9".to_string(), Scope::current().unwrap(), move |result| {
            let _ = tx.send(result);
        });

        let user = rx.await.unwrap().into_value().unwrap();
        assert_eq!(user.id, "9");
    }

    #[test]
    fn test_cancelled_scope_never_calls_back() {
        let scope = Scope::global();
        scope.cancel();
        let (tx, rx) = mpsc::channel::<Result<User>>();

        let job = api::get_user_async("1".to_string(), scope, move |result| {
            let _ = tx.send(result);
        });

        assert!(job.is_cancelled());
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_class_wrappers_share_state() {
        let repository = UserRepository::default();
        let (tx, rx) = mpsc::channel();

        let sender = tx.clone();
        let _job = repository.insert_async(5, "linus".to_string(), move |result| {
            let _ = sender.send(result.into_value().map(|len| len.to_string()));
        });
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some("1".to_string()));

        let _job = repository.find_async(5, move |result| {
            let _ = tx.send(result.into_value().flatten());
        });
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some("linus".to_string()));
    }

    #[test]
    fn test_generic_background_wrappers() {
        let (tx, rx) = mpsc::channel();
        let sender = tx.clone();
        let _job = api::first_async(vec!["x".to_string()], move |result| {
            let _ = sender.send(result.into_value().flatten());
        });
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some("x".to_string()));

        let cache = Cache::new();
        let _job = cache.push_async(11_u64, move |result| {
            let _ = tx.send(result.into_value().map(|len| len.to_string()));
        });
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some("1".to_string()));
        assert_eq!(cache.snapshot_sync(), vec![11]);
    }

    #[test]
    fn test_callback_calls_blocking_wrapper() {
        let (tx, rx) = mpsc::channel();
        let _job = api::first_async(vec![2_u64], move |_| {
            let _ = tx.send(api::get_user_sync("2".to_string()));
        });
        assert_eq!(rx.recv_timeout(WAIT).unwrap().id, "2");
    }

    #[test]
    fn test_trait_extension_wrapper() {
        let catalog = FlatCatalog(3);
        let (tx, rx) = mpsc::channel();

        let _job = catalog.price_async("abcd".to_string(), move |result| {
            let _ = tx.send(result);
        });

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Result::success(12));
    }
}

#[cfg(feature = "isolated")]
mod isolated_model {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use recast::{OriginLoop, Scope};

    #[test]
    fn test_results_arrive_on_origin_loop() {
        let mut origin = OriginLoop::install().unwrap();
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();

        let sink = Rc::clone(&seen);
        let _job = api::get_user_async("4".to_string(), Scope::global(), move |result| {
            if let Some(user) = result.into_value() {
                sink.borrow_mut().push(user.id);
            }
        });

        let sink = Rc::clone(&seen);
        let _job = FlatCatalog(2).price_async("xy".to_string(), move |result| {
            if let Some(price) = result.into_value() {
                sink.borrow_mut().push(price.to_string());
            }
        });

        assert!(origin.run_next(WAIT));
        assert!(origin.run_next(WAIT));
        let mut delivered = seen.borrow().clone();
        delivered.sort();
        assert_eq!(delivered, vec!["4".to_string(), "4".to_string()]);
    }
}
