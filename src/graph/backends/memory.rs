//! In-memory outliner store with a Datalog evaluator.
//!
//! Pages are entities with `:block/name` (lower-cased) and
//! `:block/original-name`. Page properties live on a separate property block
//! that points back at its page through `:block/page` and carries
//! `:block/properties`, a map from property key to a set of page names.
//! That is the shape the tree queries are written against.
//!
//! # Example
//!
//! ```
//! use pagetree::graph::backends::memory::MemoryStore;
//!
//! let store = MemoryStore::builder()
//!     .page("Fruit")
//!     .property("Apple", "tags", ["Fruit"])
//!     .build();
//! assert_eq!(store.page_count(), 2);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;
use crate::graph::datalog::{self, Clause, DatalogQuery, FindElem, PullPattern, Term};
use crate::graph::row::{Row, RowStream};
use crate::graph::traits::QueryExecutor;

/// Entity identifier, exposed to queries as a JSON integer.
pub type EntityId = u64;

pub const ATTR_NAME: &str = ":block/name";
pub const ATTR_ORIGINAL_NAME: &str = ":block/original-name";
pub const ATTR_PAGE: &str = ":block/page";
pub const ATTR_PROPERTIES: &str = ":block/properties";

type Attributes = BTreeMap<String, JsonValue>;
type Bindings = HashMap<String, JsonValue>;

/// A JSON graph export: a list of pages and their relation properties.
///
/// ```json
/// {"pages": [{"name": "Apple", "properties": {"tags": ["Fruit"]}}]}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphExport {
    #[serde(default)]
    pub pages: Vec<PageRecord>,
}

/// One page in a [`GraphExport`].
#[derive(Debug, Clone, Deserialize)]
pub struct PageRecord {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// A property value: one page name or a collection of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    One(String),
    Many(Vec<String>),
}

impl PropertyValue {
    fn into_names(self) -> Vec<String> {
        match self {
            PropertyValue::One(name) => vec![name],
            PropertyValue::Many(names) => names,
        }
    }
}

/// In-memory graph store.
///
/// The store can be switched offline to simulate an unreachable backend;
/// every query then fails with [`AppError::StoreUnavailable`].
#[derive(Debug)]
pub struct MemoryStore {
    entities: BTreeMap<EntityId, Attributes>,
    available: AtomicBool,
    queries: AtomicUsize,
}

impl MemoryStore {
    /// Starts building a store.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    /// Builds a store from a parsed graph export.
    pub fn from_export(export: GraphExport) -> Self {
        let mut builder = Self::builder();
        // Declare every page first so references resolve to declared casing.
        for page in &export.pages {
            builder = builder.page(&page.name);
        }
        for page in export.pages {
            for (key, value) in page.properties {
                builder = builder.property(&page.name, &key, value.into_names());
            }
        }
        builder.build()
    }

    /// Loads a JSON graph export from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let export: GraphExport = serde_json::from_str(&content)?;
        let store = Self::from_export(export);
        tracing::info!(
            path = %path.as_ref().display(),
            pages = store.page_count(),
            "Loaded graph export"
        );
        Ok(store)
    }

    /// Number of page entities.
    pub fn page_count(&self) -> usize {
        self.entities
            .values()
            .filter(|attrs| attrs.contains_key(ATTR_NAME))
            .count()
    }

    /// Number of queries executed so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Marks the store reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Parses and evaluates a query, returning the distinct result tuples.
    pub fn evaluate(&self, datalog: &str) -> Result<Vec<Row>, AppError> {
        let query = datalog::parse(datalog)?;
        self.evaluate_parsed(&query)
            .map_err(|message| AppError::query(message, datalog))
    }

    fn evaluate_parsed(&self, query: &DatalogQuery) -> Result<Vec<Row>, String> {
        let bindings = self.solve(&query.clauses, vec![Bindings::new()])?;

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for binding in bindings {
            let tuple = query
                .find
                .iter()
                .map(|elem| self.project(elem, &binding))
                .collect::<Result<Vec<_>, _>>()?;
            let key = JsonValue::Array(tuple.clone()).to_string();
            if seen.insert(key) {
                rows.push(Row::new(tuple));
            }
        }
        Ok(rows)
    }

    fn solve(&self, clauses: &[Clause], mut bindings: Vec<Bindings>) -> Result<Vec<Bindings>, String> {
        for clause in clauses {
            if bindings.is_empty() {
                break;
            }
            bindings = match clause {
                Clause::Data { e, a, v } => self.match_data(e, a, v.as_ref(), bindings)?,
                Clause::Fn {
                    name,
                    args,
                    binding,
                } => apply_fn(name, args, binding.as_deref(), bindings)?,
                Clause::Not(nested) => {
                    let mut kept = Vec::with_capacity(bindings.len());
                    for candidate in bindings {
                        if self.solve(nested, vec![candidate.clone()])?.is_empty() {
                            kept.push(candidate);
                        }
                    }
                    kept
                }
            };
        }
        Ok(bindings)
    }

    fn match_data(
        &self,
        e: &Term,
        a: &Term,
        v: Option<&Term>,
        bindings: Vec<Bindings>,
    ) -> Result<Vec<Bindings>, String> {
        let attr = match a {
            Term::Keyword(attr) => attr.as_str(),
            other => return Err(format!("attribute position must be a keyword, got {:?}", other)),
        };

        let mut out = Vec::new();
        for binding in bindings {
            let candidates: Vec<EntityId> = match resolve(e, &binding) {
                Some(JsonValue::Number(n)) => n.as_u64().into_iter().collect(),
                Some(_) => Vec::new(),
                None => self.entities.keys().copied().collect(),
            };

            for id in candidates {
                let Some(value) = self.entities.get(&id).and_then(|attrs| attrs.get(attr)) else {
                    continue;
                };

                let mut next = binding.clone();
                if let Some(var) = e.as_var() {
                    next.insert(var.to_string(), JsonValue::from(id));
                }
                if let Some(term) = v {
                    if !unify(term, value, &mut next) {
                        continue;
                    }
                }
                out.push(next);
            }
        }
        Ok(out)
    }

    fn project(&self, elem: &FindElem, binding: &Bindings) -> Result<JsonValue, String> {
        match elem {
            FindElem::Var(var) => binding
                .get(var)
                .cloned()
                .ok_or_else(|| format!("find variable {} is not bound", var)),
            FindElem::Pull { var, pattern } => {
                let id = binding
                    .get(var)
                    .and_then(JsonValue::as_u64)
                    .ok_or_else(|| format!("pull variable {} is not an entity", var))?;
                Ok(self.pull(id, pattern))
            }
        }
    }

    fn pull(&self, id: EntityId, pattern: &PullPattern) -> JsonValue {
        let mut map = Map::new();
        let Some(attrs) = self.entities.get(&id) else {
            return JsonValue::Object(map);
        };

        match pattern {
            PullPattern::Wildcard => {
                map.insert("id".to_string(), JsonValue::from(id));
                for (attr, value) in attrs {
                    map.insert(local_name(attr).to_string(), value.clone());
                }
            }
            PullPattern::Attrs(selected) => {
                for attr in selected {
                    if attr == ":db/id" {
                        map.insert("id".to_string(), JsonValue::from(id));
                    } else if let Some(value) = attrs.get(attr) {
                        map.insert(local_name(attr).to_string(), value.clone());
                    }
                }
            }
        }
        JsonValue::Object(map)
    }
}

#[async_trait]
impl QueryExecutor for MemoryStore {
    async fn execute_query(&self, datalog: &str) -> Result<RowStream<'_>, AppError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable(
                "in-memory store is offline".to_string(),
            ));
        }

        let rows = self.evaluate(datalog)?;
        tracing::trace!(rows = rows.len(), "Evaluated query");
        Ok(Box::pin(futures::stream::iter(rows.into_iter().map(Ok))))
    }
}

/// Builder for [`MemoryStore`].
///
/// Referenced pages are created on demand, the way an outliner creates a page
/// the first time something links to it.
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    entities: BTreeMap<EntityId, Attributes>,
    pages: HashMap<String, EntityId>,
    property_blocks: HashMap<EntityId, EntityId>,
    next_id: EntityId,
}

impl MemoryStoreBuilder {
    /// Declares a page. Re-declaring an existing page (case-insensitively) is a no-op.
    pub fn page(mut self, name: &str) -> Self {
        self.ensure_page(name);
        self
    }

    /// Adds names to a page's relation property.
    pub fn property<I, S>(mut self, page: &str, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let page_id = self.ensure_page(page);
        let names: Vec<String> = values
            .into_iter()
            .map(|value| {
                let id = self.ensure_page(value.as_ref());
                self.original_name(id)
            })
            .collect();

        let block_id = match self.property_blocks.get(&page_id) {
            Some(id) => *id,
            None => {
                let id = self.allocate();
                let mut attrs = Attributes::new();
                attrs.insert(ATTR_PAGE.to_string(), JsonValue::from(page_id));
                attrs.insert(ATTR_PROPERTIES.to_string(), JsonValue::Object(Map::new()));
                self.entities.insert(id, attrs);
                self.property_blocks.insert(page_id, id);
                id
            }
        };

        if let Some(JsonValue::Object(props)) = self
            .entities
            .get_mut(&block_id)
            .and_then(|attrs| attrs.get_mut(ATTR_PROPERTIES))
        {
            let entry = props
                .entry(key.to_string())
                .or_insert_with(|| JsonValue::Array(Vec::new()));
            if let JsonValue::Array(set) = entry {
                for name in names {
                    let name = JsonValue::String(name);
                    if !set.contains(&name) {
                        set.push(name);
                    }
                }
            }
        }
        self
    }

    /// Finishes the store. It starts out available.
    pub fn build(self) -> MemoryStore {
        MemoryStore {
            entities: self.entities,
            available: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
        }
    }

    fn ensure_page(&mut self, name: &str) -> EntityId {
        let key = name.to_lowercase();
        if let Some(id) = self.pages.get(&key) {
            return *id;
        }

        let id = self.allocate();
        let mut attrs = Attributes::new();
        attrs.insert(ATTR_NAME.to_string(), JsonValue::String(key.clone()));
        attrs.insert(
            ATTR_ORIGINAL_NAME.to_string(),
            JsonValue::String(name.to_string()),
        );
        self.entities.insert(id, attrs);
        self.pages.insert(key, id);
        id
    }

    fn original_name(&self, id: EntityId) -> String {
        self.entities
            .get(&id)
            .and_then(|attrs| attrs.get(ATTR_ORIGINAL_NAME))
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn allocate(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }
}

/// Returns the value a term denotes under `binding`, or `None` if it is an
/// unbound variable or a blank.
fn resolve(term: &Term, binding: &Bindings) -> Option<JsonValue> {
    match term {
        Term::Var(var) => binding.get(var).cloned(),
        Term::Keyword(kw) => Some(JsonValue::String(kw.clone())),
        Term::Str(s) => Some(JsonValue::String(s.clone())),
        Term::Int(n) => Some(JsonValue::from(*n)),
        Term::Blank => None,
    }
}

/// Matches `value` against `term`, binding a fresh variable if needed.
fn unify(term: &Term, value: &JsonValue, binding: &mut Bindings) -> bool {
    match term {
        Term::Blank => true,
        Term::Var(var) => match binding.get(var) {
            Some(bound) => bound == value,
            None => {
                binding.insert(var.clone(), value.clone());
                true
            }
        },
        other => resolve(other, binding).as_ref() == Some(value),
    }
}

fn apply_fn(
    name: &str,
    args: &[Term],
    output: Option<&str>,
    bindings: Vec<Bindings>,
) -> Result<Vec<Bindings>, String> {
    let mut out = Vec::with_capacity(bindings.len());
    for mut binding in bindings {
        let values = args
            .iter()
            .map(|arg| match arg {
                Term::Var(var) => binding
                    .get(var)
                    .cloned()
                    .ok_or_else(|| format!("insufficient bindings: {} is unbound in ({})", var, name)),
                other => resolve(other, &binding)
                    .ok_or_else(|| format!("blank argument in ({})", name)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = call(name, &values)?;
        match output {
            Some(var) => {
                // nil results drop the binding
                if result.is_null() {
                    continue;
                }
                if !unify(&Term::Var(var.to_string()), &result, &mut binding) {
                    continue;
                }
                out.push(binding);
            }
            None => {
                if truthy(&result) {
                    out.push(binding);
                }
            }
        }
    }
    Ok(out)
}

fn call(name: &str, args: &[JsonValue]) -> Result<JsonValue, String> {
    match (name, args) {
        ("get", [JsonValue::Object(map), key]) => Ok(key
            .as_str()
            .and_then(|k| map.get(k.trim_start_matches(':')))
            .cloned()
            .unwrap_or(JsonValue::Null)),
        ("get", [_, _]) => Ok(JsonValue::Null),
        ("contains?", [coll, item]) => Ok(JsonValue::Bool(match coll {
            JsonValue::Array(items) => items.contains(item),
            JsonValue::Object(map) => item
                .as_str()
                .is_some_and(|k| map.contains_key(k.trim_start_matches(':'))),
            _ => false,
        })),
        ("=", [a, b]) => Ok(JsonValue::Bool(a == b)),
        ("not=", [a, b]) => Ok(JsonValue::Bool(a != b)),
        ("get" | "contains?" | "=" | "not=", _) => {
            Err(format!("wrong number of arguments ({}) to {}", args.len(), name))
        }
        _ => Err(format!("unknown function {}", name)),
    }
}

fn truthy(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Null | JsonValue::Bool(false))
}

fn local_name(attr: &str) -> &str {
    let attr = attr.trim_start_matches(':');
    attr.rsplit_once('/').map_or(attr, |(_, local)| local)
}
