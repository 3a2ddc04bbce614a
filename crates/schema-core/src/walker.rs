use jsonref::JsonPointer;

use crate::{
    dialect::Dialect, report::ProcessingReport, resolver::RefResolver, tree::SchemaTree, Error,
};

/// Receives traversal events from a [`SchemaWalker`].
///
/// For a subtree with children, the callback sequence is exactly
/// `entering_path(self)`, `visiting(self)`, then the full sequence for
/// each child in collector order, then `exiting_path(self)`. Listeners
/// that maintain parent-relative state rely on this pairing.
pub trait SchemaListener {
    type Output;

    /// Called before a subtree is visited with its logical path.
    ///
    /// # Errors
    ///
    /// A listener error aborts the walk.
    fn entering_path(
        &mut self,
        path: &JsonPointer,
        report: &mut ProcessingReport,
    ) -> Result<(), Error> {
        let _ = (path, report);
        Ok(())
    }

    /// Called once per subtree with the (possibly reference-resolved)
    /// tree positioned at it.
    ///
    /// # Errors
    ///
    /// A listener error aborts the walk.
    fn visiting(&mut self, tree: &SchemaTree, report: &mut ProcessingReport) -> Result<(), Error>;

    /// Called after all of a subtree's children have been walked.
    ///
    /// # Errors
    ///
    /// A listener error aborts the walk.
    fn exiting_path(
        &mut self,
        path: &JsonPointer,
        report: &mut ProcessingReport,
    ) -> Result<(), Error> {
        let _ = (path, report);
        Ok(())
    }

    /// Consume the listener to produce its result.
    fn into_output(self) -> Self::Output;
}

type ChildrenFn<'a> =
    dyn Fn(&SchemaTree, &mut ProcessingReport) -> Result<Vec<JsonPointer>, Error> + 'a;

/// Generic recursive traversal over a schema tree.
///
/// Which child subschemas exist at a node is decided by a pluggable
/// strategy: by default the dialect's pointer collectors, intersected
/// with the members actually present and applied in lexicographic
/// keyword order so traversal is reproducible run to run. The syntax
/// pass substitutes its own strategy so that ill-formed keywords are
/// never recursed into.
///
/// The walker assumes the tree is syntax-valid where it visits; it does
/// no defensive type checks of its own.
pub struct SchemaWalker<'a> {
    children: Box<ChildrenFn<'a>>,
    resolver: Option<&'a RefResolver>,
}

impl<'a> SchemaWalker<'a> {
    /// A walker enumerating children through `dialect`'s collectors.
    #[must_use]
    pub fn new(dialect: &'a Dialect) -> SchemaWalker<'a> {
        SchemaWalker::with_children(move |tree, _: &mut ProcessingReport| {
            Ok(dialect.collect_children(tree))
        })
    }

    /// A walker with a custom child-enumeration strategy. The strategy
    /// returns pointers relative to the node it is given.
    pub fn with_children(
        children: impl Fn(&SchemaTree, &mut ProcessingReport) -> Result<Vec<JsonPointer>, Error> + 'a,
    ) -> SchemaWalker<'a> {
        SchemaWalker {
            children: Box::new(children),
            resolver: None,
        }
    }

    /// Substitute reference-resolved trees before each `visiting` call.
    #[must_use]
    pub fn resolving(mut self, resolver: &'a RefResolver) -> SchemaWalker<'a> {
        self.resolver = Some(resolver);
        self
    }

    /// Walk the subtree rooted at `tree`, reporting paths relative to it
    /// starting from the empty pointer.
    ///
    /// # Errors
    ///
    /// Propagates listener errors, reference-resolution errors from a
    /// resolving walker, and raised report messages.
    pub fn walk<L: SchemaListener>(
        &self,
        tree: &SchemaTree,
        listener: &mut L,
        report: &mut ProcessingReport,
    ) -> Result<(), Error> {
        self.walk_at(tree, &JsonPointer::root(), listener, report)
    }

    fn walk_at<L: SchemaListener>(
        &self,
        tree: &SchemaTree,
        path: &JsonPointer,
        listener: &mut L,
        report: &mut ProcessingReport,
    ) -> Result<(), Error> {
        listener.entering_path(path, report)?;
        let resolved = match self.resolver {
            Some(resolver) => resolver.resolve(tree.clone())?,
            None => tree.clone(),
        };
        listener.visiting(&resolved, report)?;
        for relative in (self.children)(&resolved, report)? {
            let child = resolved.append(&relative);
            self.walk_at(&child, &path.join(&relative), listener, report)?;
        }
        listener.exiting_path(path, report)
    }
}
