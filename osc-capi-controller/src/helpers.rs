use std::fmt::Display;

use kube::{
    runtime::{
        controller::{Action, Error as ControllerError},
        reflector::ObjectRef,
        watcher::Error as WatcherError,
    },
    Resource,
};
use log::{debug, error, info, warn};
use osc_capi_core::helpers::pretty_type_name;

/// Logs the outcome of a single reconciliation pass, used as the `for_each` sink of the controllers.
pub fn handle_reconciliation_result<T, E>(
    result: Result<(ObjectRef<T>, Action), ControllerError<E, WatcherError>>,
) -> impl std::future::Future<Output = ()>
where
    T: Resource,
    E: Display,
{
    let kind = pretty_type_name::<T>();

    match result {
        Ok((object, action)) => {
            info!(
                "Reconciled {kind} '{}' in '{}' namespace",
                object.name,
                object.namespace.as_deref().unwrap_or("---")
            );
            debug!("Next action for {kind} '{}': {action:?}", object.name);
        }
        Err(ControllerError::ObjectNotFound(object)) => {
            debug!("{kind} '{}' is gone, skipping", object.name)
        }
        Err(ControllerError::ReconcilerFailed(reconciler_error, object)) => warn!(
            "{kind} '{}' in '{}' namespace failed to reconcile: {reconciler_error}",
            object.name,
            object.namespace.as_deref().unwrap_or("---")
        ),
        Err(ControllerError::QueueError(watcher_error)) => {
            error!("{kind} watcher has failed! {watcher_error}")
        }
    }

    std::future::ready(())
}
