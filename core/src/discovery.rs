// pipewright/src/discovery.rs

//! Turns declared names like `100-load-user.rs` into ordered step lists.
//!
//! Two sources are supported. Explicit registration (`Pipeline::step`) parses
//! each declared name and inserts it in order. Directory scanning
//! ([`scan_dir`]) lists a directory, keeps the files matching the naming
//! pattern and resolves each one through a [`Catalog`], the in-process stand-in
//! for a dynamic module loader. Both reject duplicate ordering keys.

use crate::core::context_data::ContextData;
use crate::core::http::{Request, Response};
use crate::core::step::{
  step_handler, task_handler, AsyncTask, Ordered, Step, StepDef, StepHandler, TaskHandler,
};
use crate::error::{WrightError, WrightResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{event, Level};

static DECLARED_NAME: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?P<order>\d+)-(?P<label>[^./\\]+)(?P<ext>\.[A-Za-z0-9]+)?$")
    .expect("declared name pattern is a valid regex")
});

/// Parses `<order>-<label>[.<ext>]`. Returns `None` for anything else,
/// including ordering keys that do not fit in a `u64`.
pub fn parse_declared_name(declared: &str) -> Option<StepDef> {
  let caps = DECLARED_NAME.captures(declared)?;
  let order = caps["order"].parse::<u64>().ok()?;
  let label = caps["label"].to_string();
  let ext_len = caps.name("ext").map_or(0, |ext| ext.as_str().len());
  Some(StepDef {
    order,
    name: declared[..declared.len() - ext_len].to_string(),
    label,
    source: declared.to_string(),
  })
}

/// Like [`parse_declared_name`] but for directory entries, which must carry an extension.
fn parse_file_name(file_name: &str) -> Option<StepDef> {
  let caps = DECLARED_NAME.captures(file_name)?;
  caps.name("ext")?;
  parse_declared_name(file_name)
}

/// Parses an explicitly declared name; malformed names are configuration errors.
pub(crate) fn declared_def(declared: &str) -> WrightResult<StepDef> {
  parse_declared_name(declared).ok_or_else(|| WrightError::MalformedName {
    name: declared.to_string(),
  })
}

/// Inserts `unit` keeping `units` sorted by ascending order.
pub(crate) fn insert_ordered<U: Ordered>(units: &mut Vec<U>, unit: U) -> WrightResult<()> {
  let order = unit.def().order;
  if let Some(existing) = units.iter().find(|u| u.def().order == order) {
    return Err(WrightError::DuplicateOrder {
      order,
      first: existing.def().source.clone(),
      second: unit.def().source.clone(),
    });
  }
  let idx = units.partition_point(|u| u.def().order < order);
  units.insert(idx, unit);
  Ok(())
}

/// Stable numeric sort; fails on the first pair sharing an ordering key.
pub fn order_units<U: Ordered>(mut units: Vec<U>) -> WrightResult<Vec<U>> {
  units.sort_by_key(|u| u.def().order);
  if let Some(pair) = units.windows(2).find(|pair| pair[0].def().order == pair[1].def().order) {
    return Err(WrightError::DuplicateOrder {
      order: pair[0].def().order,
      first: pair[0].def().source.clone(),
      second: pair[1].def().source.clone(),
    });
  }
  Ok(units)
}

/// A directory entry that matched the naming pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
  pub def: StepDef,
  pub path: PathBuf,
}

impl Ordered for DiscoveredFile {
  fn def(&self) -> &StepDef {
    &self.def
  }
}

/// Lists `dir` and returns its step files in ascending order.
///
/// A missing directory is an empty list. Entries that are not files or whose
/// names do not match `<order>-<label>.<ext>` are ignored.
pub fn scan_dir(dir: &Path) -> WrightResult<Vec<DiscoveredFile>> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == ErrorKind::NotFound => {
      event!(Level::DEBUG, dir = %dir.display(), "Directory absent, no units discovered.");
      return Ok(Vec::new());
    }
    Err(source) => {
      return Err(WrightError::Discovery {
        dir: dir.display().to_string(),
        source,
      })
    }
  };

  let mut found = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|source| WrightError::Discovery {
      dir: dir.display().to_string(),
      source,
    })?;
    let path = entry.path();
    if !path.is_file() {
      continue;
    }
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
      continue;
    };
    match parse_file_name(file_name) {
      Some(def) => found.push(DiscoveredFile { def, path: path.clone() }),
      None => event!(Level::DEBUG, file = %file_name, "Ignoring file not matching '<order>-<label>.<ext>'."),
    }
  }

  let ordered = order_units(found)?;
  event!(Level::DEBUG, dir = %dir.display(), count = ordered.len(), "Directory scanned.");
  Ok(ordered)
}

/// Name-keyed handler table used to resolve scanned files.
///
/// Handlers are registered under the declared name without extension
/// (`100-load-user`); registering `100-load-user.rs` is equivalent.
pub struct Catalog<TData: 'static + Send + Sync> {
  steps: HashMap<String, StepHandler<TData>>,
  tasks: HashMap<String, TaskHandler<TData>>,
}

impl<TData: 'static + Send + Sync> Default for Catalog<TData> {
  fn default() -> Self {
    Self {
      steps: HashMap::new(),
      tasks: HashMap::new(),
    }
  }
}

fn catalog_key(name: &str) -> String {
  parse_declared_name(name).map_or_else(|| name.to_string(), |def| def.name)
}

impl<TData: 'static + Send + Sync> Catalog<TData> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn step<F, Fut, E>(&mut self, name: &str, handler_fn: F) -> &mut Self
  where
    F: Fn(ContextData<TData>, Arc<Request>, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
  {
    self.steps.insert(catalog_key(name), step_handler(handler_fn));
    self
  }

  pub fn task<F, Fut, E>(&mut self, name: &str, handler_fn: F) -> &mut Self
  where
    F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
  {
    self.tasks.insert(catalog_key(name), task_handler(handler_fn));
    self
  }

  pub fn resolve_steps(&self, files: &[DiscoveredFile]) -> WrightResult<Vec<Step<TData>>> {
    files
      .iter()
      .map(|file| {
        let handler = self.steps.get(&file.def.name).ok_or_else(|| unresolved(file))?;
        Ok(Step::new(file.def.clone(), Arc::clone(handler)))
      })
      .collect()
  }

  pub fn resolve_tasks(&self, files: &[DiscoveredFile]) -> WrightResult<Vec<AsyncTask<TData>>> {
    files
      .iter()
      .map(|file| {
        let handler = self.tasks.get(&file.def.name).ok_or_else(|| unresolved(file))?;
        Ok(AsyncTask::new(file.def.clone(), Arc::clone(handler)))
      })
      .collect()
  }
}

fn unresolved(file: &DiscoveredFile) -> WrightError {
  WrightError::UnresolvedModule {
    name: file.def.name.clone(),
    path: file.path.display().to_string(),
  }
}
