use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use jsonref::JsonPointer;
use parking_lot::{Condvar, Mutex};

use crate::{
    report::{LogLevel, ProcessingReport},
    syntax::SyntaxProcessor,
    tree::{SchemaKey, SchemaTree},
    Error,
};

/// The outcome of one full walk rooted at a cache key's pointer.
struct Analysis {
    visited: AHashSet<JsonPointer>,
    report: ProcessingReport,
}

enum FlightState {
    Pending,
    Done(Result<Arc<Analysis>, Error>),
}

/// At most one computation runs per cell; concurrent callers block on
/// the condvar and share the outcome, success or failure alike.
struct Cell {
    state: Mutex<FlightState>,
    ready: Condvar,
}

impl Cell {
    fn new() -> Arc<Cell> {
        Arc::new(Cell {
            state: Mutex::new(FlightState::Pending),
            ready: Condvar::new(),
        })
    }
}

type CacheKey = (SchemaKey, JsonPointer);

/// Memoizes syntax analysis per document identity and pointer.
///
/// `analyze` probes in two steps: if a prior root-level analysis of the
/// same document already visited the requested pointer, its report is
/// reused outright; otherwise an entry keyed at the requested pointer is
/// computed (or awaited, when another thread is already computing it).
/// Failed computations are evicted after their waiters are notified, so
/// a later call retries instead of seeing the failure forever.
pub struct SchemaAnalyzer {
    processor: SyntaxProcessor,
    log_level: LogLevel,
    raise_threshold: LogLevel,
    cells: Mutex<AHashMap<CacheKey, Arc<Cell>>>,
}

impl SchemaAnalyzer {
    #[must_use]
    pub fn new(processor: SyntaxProcessor) -> SchemaAnalyzer {
        SchemaAnalyzer {
            processor,
            log_level: LogLevel::Info,
            raise_threshold: LogLevel::Fatal,
            cells: Mutex::new(AHashMap::new()),
        }
    }

    /// An analyzer over the shipped dialects.
    #[must_use]
    pub fn with_default_dialects() -> SchemaAnalyzer {
        SchemaAnalyzer::new(SyntaxProcessor::with_default_dialects())
    }

    /// Configure the levels of the reports produced per analysis.
    #[must_use]
    pub fn with_levels(mut self, log_level: LogLevel, raise_threshold: LogLevel) -> SchemaAnalyzer {
        self.log_level = log_level;
        self.raise_threshold = raise_threshold;
        self
    }

    /// Syntax-check the subtree at `tree`'s current position, memoized.
    ///
    /// # Errors
    ///
    /// Fails when a report message reaches the raise threshold; the
    /// failure is shared with concurrent callers of the same position
    /// and retried on the next call.
    pub fn analyze(&self, tree: &SchemaTree) -> Result<ProcessingReport, Error> {
        let key = tree.key().clone();
        if let Some(analysis) = self.completed(&(key.clone(), JsonPointer::root())) {
            if analysis.visited.contains(tree.pointer()) {
                return Ok(analysis.report.clone());
            }
        }
        let analysis = self.analyze_at((key, tree.pointer().clone()), tree)?;
        Ok(analysis.report.clone())
    }

    /// A completed entry for `key`, without triggering computation.
    fn completed(&self, key: &CacheKey) -> Option<Arc<Analysis>> {
        let cells = self.cells.lock();
        let cell = cells.get(key)?;
        let state = cell.state.lock();
        match &*state {
            FlightState::Done(Ok(analysis)) => Some(Arc::clone(analysis)),
            _ => None,
        }
    }

    fn analyze_at(&self, key: CacheKey, tree: &SchemaTree) -> Result<Arc<Analysis>, Error> {
        let (cell, leader) = {
            let mut cells = self.cells.lock();
            match cells.get(&key) {
                Some(cell) => (Arc::clone(cell), false),
                None => {
                    let cell = Cell::new();
                    cells.insert(key.clone(), Arc::clone(&cell));
                    (cell, true)
                }
            }
        };
        if leader {
            let outcome = self.compute(tree);
            let mut state = cell.state.lock();
            *state = FlightState::Done(outcome.clone());
            drop(state);
            cell.ready.notify_all();
            if outcome.is_err() {
                let mut cells = self.cells.lock();
                if cells
                    .get(&key)
                    .is_some_and(|current| Arc::ptr_eq(current, &cell))
                {
                    cells.remove(&key);
                }
            }
            outcome
        } else {
            let mut state = cell.state.lock();
            loop {
                if let FlightState::Done(outcome) = &*state {
                    return outcome.clone();
                }
                cell.ready.wait(&mut state);
            }
        }
    }

    fn compute(&self, tree: &SchemaTree) -> Result<Arc<Analysis>, Error> {
        let mut report = ProcessingReport::with_levels(self.log_level, self.raise_threshold);
        let visited = self.processor.check(tree, &mut report)?;
        Ok(Arc::new(Analysis { visited, report }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use jsonref::JsonPointer;
    use serde_json::json;

    use crate::{
        dialect::{Dialect, DialectRegistry, KeywordChecker},
        report::LogLevel,
        syntax::SyntaxProcessor,
        tree::SchemaTree,
        types::TypeSet,
        Error,
    };

    use super::SchemaAnalyzer;

    /// A dialect whose single keyword counts checker invocations.
    fn counting_analyzer(calls: Arc<AtomicUsize>) -> SchemaAnalyzer {
        let checker = KeywordChecker::with_refinement(
            TypeSet::any(),
            move |_keyword, _tree, _report, _pointers| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
        let dialect = Dialect::builder("http://example.com/counting")
            .keyword("k1", checker)
            .unwrap()
            .build()
            .unwrap();
        let registry = DialectRegistry::builder()
            .register(dialect)
            .unwrap()
            .default_dialect("http://example.com/counting")
            .build()
            .unwrap();
        SchemaAnalyzer::new(SyntaxProcessor::new(Arc::new(registry)))
    }

    #[test]
    fn identical_trees_are_analyzed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let analyzer = counting_analyzer(Arc::clone(&calls));
        let tree = SchemaTree::anonymous(json!({"k1": 1}));
        analyzer.analyze(&tree).unwrap();
        analyzer.analyze(&tree).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn root_analysis_covers_interior_pointers() {
        let analyzer = SchemaAnalyzer::with_default_dialects();
        let tree = SchemaTree::anonymous(json!({
            "properties": {"a": {"type": "string"}}
        }));
        let first = analyzer.analyze(&tree).unwrap();
        let interior = tree.append(&JsonPointer::parse("/properties/a").unwrap());
        let second = analyzer.analyze(&interior).unwrap();
        assert!(first.is_success());
        assert_eq!(first.len(), second.len());
        {
            let cells = analyzer.cells.lock();
            assert_eq!(cells.len(), 1);
        }
    }

    #[test]
    fn interior_first_produces_independent_entries() {
        let analyzer = SchemaAnalyzer::with_default_dialects();
        let tree = SchemaTree::anonymous(json!({
            "properties": {"a": {"type": "string"}}
        }));
        let interior = tree.append(&JsonPointer::parse("/properties/a").unwrap());
        analyzer.analyze(&interior).unwrap();
        analyzer.analyze(&tree).unwrap();
        let cells = analyzer.cells.lock();
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn structurally_identical_anonymous_documents_are_distinct() {
        let calls = Arc::new(AtomicUsize::new(0));
        let analyzer = counting_analyzer(Arc::clone(&calls));
        analyzer
            .analyze(&SchemaTree::anonymous(json!({"k1": 1})))
            .unwrap();
        analyzer
            .analyze(&SchemaTree::anonymous(json!({"k1": 1})))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failures_are_retried() {
        let analyzer = SchemaAnalyzer::with_default_dialects()
            .with_levels(LogLevel::Info, LogLevel::Error);
        let tree = SchemaTree::anonymous(json!({"enum": []}));
        assert!(matches!(analyzer.analyze(&tree), Err(Error::Fatal(_))));
        // The failed cell was evicted; a second call computes again and
        // fails the same way rather than observing a poisoned entry.
        assert!(matches!(analyzer.analyze(&tree), Err(Error::Fatal(_))));
        assert!(analyzer.cells.lock().is_empty());
    }

    #[test]
    fn concurrent_callers_share_one_computation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let analyzer = Arc::new(counting_analyzer(Arc::clone(&calls)));
        let tree = SchemaTree::anonymous(json!({"k1": 1}));
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let analyzer = Arc::clone(&analyzer);
                let tree = tree.clone();
                scope.spawn(move || analyzer.analyze(&tree).unwrap());
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
