//! Import statement extraction, composition, and source splicing.

pub mod compose;
pub mod extract;
pub mod rewrite;

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

/// 1-indexed first and last source line spanned by a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

/// An import or require statement found in the input, in its destructured
/// shape: whole-module bindings, default bindings, and named props.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingImport {
    pub dep_id: String,
    pub idents: Vec<String>,
    pub defaults: Vec<String>,
    pub props: Vec<String>,
    pub span: LineSpan,
}

/// Target bindings for one module in the composed block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBindings {
    pub idents: BTreeSet<String>,
    pub defaults: BTreeSet<String>,
    pub props: BTreeSet<String>,
}

impl ImportBindings {
    pub fn is_empty(&self) -> bool {
        self.idents.is_empty() && self.defaults.is_empty() && self.props.is_empty()
    }
}

/// The merged target set handed to the composer: module id to bindings.
pub type LibsToAdd = FxHashMap<String, ImportBindings>;
