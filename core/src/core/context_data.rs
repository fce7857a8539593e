// pipewright/src/core/context_data.rs

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Shared handle to one request's context data.
///
/// The pipeline creates exactly one `ContextData` per request and hands clones
/// of the handle to every step, the error handler and the background tasks,
/// so mutations made by step N are visible to step N+1, to a retried run and
/// to the tasks that run afterwards.
///
/// IMPORTANT: lock guards are blocking and MUST NOT be held across `.await`
/// suspension points.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
    self.0.try_read()
  }

  pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
    self.0.try_write()
  }

  // e.g. ctx.map_read(|data| &data.user_id)
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }

  pub fn map_write<F, U: ?Sized>(&self, f: F) -> MappedRwLockWriteGuard<'_, U>
  where
    F: FnOnce(&mut T) -> &mut U,
  {
    RwLockWriteGuard::map(self.write(), f)
  }

  /// True when both handles point at the same request context.
  pub fn same_context(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl<T: Serialize + Send + Sync + 'static> ContextData<T> {
  /// Top-level view of the data as a JSON object, used by the debug tracer.
  ///
  /// Non-object data is reported under the single key `"value"`; data that
  /// fails to serialize under `"<unserializable>"`.
  pub fn snapshot(&self) -> Map<String, Value> {
    let serialized = serde_json::to_value(&*self.read());
    match serialized {
      Ok(Value::Object(entries)) => entries,
      Ok(other) => {
        let mut entries = Map::new();
        entries.insert("value".to_string(), other);
        entries
      }
      Err(e) => {
        let mut entries = Map::new();
        entries.insert("<unserializable>".to_string(), Value::String(e.to_string()));
        entries
      }
    }
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
