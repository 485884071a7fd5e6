//! Static export analysis of project source files.
//!
//! Walks the top-level statements of a parsed file and reports what it
//! exports: whole-value idents, named props, and whether a default export
//! exists. CommonJS (`module.exports`, `exports.K`) and ES export forms are
//! both understood. Object-literal bindings are tracked shallowly so that
//! `const x = {}; x.a = 1; module.exports = x;` reports `a` as a prop.

use std::collections::BTreeSet;
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    AssignmentExpression, AssignmentOperator, AssignmentTarget, Declaration,
    ExportDefaultDeclaration, ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression,
    ModuleExportName, ObjectExpression, ObjectPropertyKind, Program, PropertyKey, Statement,
};
use oxc_parser::Parser;
use oxc_span::SourceType;
use rustc_hash::FxHashMap;

/// What one file exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportScan {
    pub idents: BTreeSet<String>,
    pub props: BTreeSet<String>,
    pub has_default: bool,
    pub has_exports: bool,
}

/// Parse and analyze a project file. `None` when the file does not parse;
/// the caller falls back to id-derived identifiers.
pub fn analyze_exports(path: &Path, code: &str) -> Option<ExportScan> {
    let source_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") => SourceType::ts(),
        Some("tsx") => SourceType::tsx(),
        _ => SourceType::jsx(),
    };
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return None;
    }
    Some(scan_program(&ret.program))
}

fn scan_program(program: &Program<'_>) -> ExportScan {
    let mut state = ScanState::default();
    for stmt in &program.body {
        state.statement(stmt);
    }
    state.scan
}

#[derive(Default)]
struct ScanState {
    /// Object-literal keys accumulated per top-level binding. Reassignment
    /// resets; `const y = x` copies.
    shapes: FxHashMap<String, Vec<String>>,
    scan: ExportScan,
}

impl ScanState {
    fn statement(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    let Some(name) = declarator.id.get_identifier_name() else {
                        continue;
                    };
                    match declarator.init.as_ref() {
                        Some(Expression::ObjectExpression(object)) => {
                            self.shapes.insert(name.to_string(), object_keys(object));
                        }
                        Some(Expression::Identifier(other)) => {
                            if let Some(keys) = self.shapes.get(other.name.as_str()).cloned() {
                                self.shapes.insert(name.to_string(), keys);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Statement::ExpressionStatement(stmt) => {
                if let Expression::AssignmentExpression(assign) = &stmt.expression {
                    self.assignment(assign);
                }
            }
            Statement::ExportNamedDeclaration(decl) => self.named_export(decl),
            Statement::ExportDefaultDeclaration(decl) => self.default_export(decl),
            Statement::ExportAllDeclaration(decl) => {
                if !decl.export_kind.is_type() {
                    self.scan.has_exports = true;
                }
            }
            _ => {}
        }
    }

    fn assignment(&mut self, assign: &AssignmentExpression<'_>) {
        if assign.operator != AssignmentOperator::Assign {
            return;
        }
        match &assign.left {
            AssignmentTarget::AssignmentTargetIdentifier(target) => {
                match &assign.right {
                    Expression::ObjectExpression(object) => {
                        self.shapes
                            .insert(target.name.to_string(), object_keys(object));
                    }
                    Expression::Identifier(other) => {
                        if let Some(keys) = self.shapes.get(other.name.as_str()).cloned() {
                            self.shapes.insert(target.name.to_string(), keys);
                        }
                    }
                    _ => {}
                }
            }
            AssignmentTarget::StaticMemberExpression(member) => {
                let key = member.property.name.as_str();
                match &member.object {
                    // module.exports = …
                    Expression::Identifier(object)
                        if object.name == "module" && key == "exports" =>
                    {
                        self.exports_value(&assign.right);
                    }
                    // exports.K = …
                    Expression::Identifier(object) if object.name == "exports" => {
                        self.export_prop(key, &assign.right);
                    }
                    // module.exports.K = …
                    Expression::StaticMemberExpression(inner)
                        if matches!(&inner.object, Expression::Identifier(o) if o.name == "module")
                            && inner.property.name == "exports" =>
                    {
                        self.export_prop(key, &assign.right);
                    }
                    // x.K = … accretes onto a tracked object binding.
                    Expression::Identifier(object) => {
                        let keys = self.shapes.entry(object.name.to_string()).or_default();
                        if !keys.iter().any(|existing| existing == key) {
                            keys.push(key.to_string());
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    /// Whole-value assignment to `module.exports`.
    fn exports_value(&mut self, value: &Expression<'_>) {
        self.scan.has_exports = true;
        match value {
            Expression::Identifier(name) => {
                self.scan.idents.insert(name.name.to_string());
                if let Some(keys) = self.shapes.get(name.name.as_str()) {
                    self.scan.props.extend(keys.iter().cloned());
                }
            }
            Expression::ObjectExpression(object) => {
                self.scan.props.extend(object_keys(object));
            }
            Expression::FunctionExpression(function) => {
                self.scan.has_default = true;
                if let Some(id) = &function.id {
                    self.scan.idents.insert(id.name.to_string());
                }
            }
            Expression::ArrowFunctionExpression(_) => {
                self.scan.has_default = true;
            }
            Expression::ClassExpression(class) => {
                self.scan.has_default = true;
                if let Some(id) = &class.id {
                    self.scan.idents.insert(id.name.to_string());
                }
            }
            Expression::NewExpression(new_expr) => {
                if let Expression::Identifier(callee) = &new_expr.callee {
                    self.scan.idents.insert(callee.name.to_string());
                }
            }
            Expression::StaticMemberExpression(member) => {
                self.scan.idents.insert(member.property.name.to_string());
            }
            _ => {}
        }
    }

    /// `exports.K = …` / `module.exports.K = …`.
    fn export_prop(&mut self, key: &str, value: &Expression<'_>) {
        self.scan.has_exports = true;
        if key == "default" {
            self.scan.has_default = true;
            if let Some(name) = named_value_ident(value) {
                self.scan.idents.insert(name);
            }
        } else {
            self.scan.props.insert(key.to_string());
        }
    }

    fn named_export(&mut self, decl: &ExportNamedDeclaration<'_>) {
        if decl.export_kind.is_type() {
            return;
        }
        self.scan.has_exports = true;

        if let Some(declaration) = &decl.declaration {
            match declaration {
                Declaration::VariableDeclaration(var) => {
                    for declarator in &var.declarations {
                        if let Some(name) = declarator.id.get_identifier_name() {
                            self.scan.props.insert(name.to_string());
                        }
                    }
                }
                Declaration::FunctionDeclaration(function) => {
                    if let Some(id) = &function.id {
                        self.scan.props.insert(id.name.to_string());
                    }
                }
                Declaration::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        self.scan.props.insert(id.name.to_string());
                    }
                }
                _ => {}
            }
        }

        for specifier in &decl.specifiers {
            if specifier.export_kind.is_type() {
                continue;
            }
            let exported = module_export_name(&specifier.exported);
            if exported == "default" {
                self.scan.has_default = true;
                let local = module_export_name(&specifier.local);
                if !local.is_empty() && local != "default" {
                    self.scan.idents.insert(local);
                }
            } else if !exported.is_empty() {
                self.scan.props.insert(exported);
            }
        }
    }

    fn default_export(&mut self, decl: &ExportDefaultDeclaration<'_>) {
        self.scan.has_exports = true;
        self.scan.has_default = true;
        match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                if let Some(id) = &function.id {
                    self.scan.idents.insert(id.name.to_string());
                }
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    self.scan.idents.insert(id.name.to_string());
                }
            }
            _ => {
                if let Some(Expression::Identifier(name)) =
                    decl.declaration.as_expression()
                {
                    self.scan.idents.insert(name.name.to_string());
                }
            }
        }
    }
}

fn module_export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(name) => name.name.to_string(),
        ModuleExportName::IdentifierReference(name) => name.name.to_string(),
        ModuleExportName::StringLiteral(literal) => literal.value.to_string(),
    }
}

fn named_value_ident(value: &Expression<'_>) -> Option<String> {
    match value {
        Expression::Identifier(name) => Some(name.name.to_string()),
        Expression::FunctionExpression(function) => {
            function.id.as_ref().map(|id| id.name.to_string())
        }
        Expression::ClassExpression(class) => class.id.as_ref().map(|id| id.name.to_string()),
        _ => None,
    }
}

fn object_keys(object: &ObjectExpression<'_>) -> Vec<String> {
    let mut keys = Vec::new();
    for property in &object.properties {
        let ObjectPropertyKind::ObjectProperty(property) = property else {
            continue;
        };
        match &property.key {
            PropertyKey::StaticIdentifier(name) => keys.push(name.name.to_string()),
            PropertyKey::StringLiteral(literal) => keys.push(literal.value.to_string()),
            _ => {}
        }
    }
    keys
}
