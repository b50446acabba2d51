//! Semantic walker over tree-sitter-c parse trees.
//!
//! Single-translation-unit analyzer: no preprocessing, type knowledge
//! limited to what declarations in the same file provide. Emits the
//! reporter callbacks with positions, access modes, locality, and the
//! enclosing definition as context.

use std::collections::HashMap;
use std::fs;

use anyhow::{anyhow, Context, Result};
use tree_sitter::Node;

use super::{InputStream, Position, Reporter, SymbolEvent, SymbolKind};
use crate::index::mode::{DEF, R_AOF, R_PTR, R_VAL, SHIFT, W_VAL};

/// Reference C analyzer driving a [`Reporter`].
pub struct Dissector {
    parser: tree_sitter::Parser,
}

impl Dissector {
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_c::language())
            .context("unable to load C grammar")?;
        Ok(Self { parser })
    }

    /// Analyze every stream in order, emitting callbacks as symbols are
    /// encountered.
    pub fn dissect(&mut self, streams: &[InputStream], reporter: &mut dyn Reporter) -> Result<()> {
        for (stream, input) in streams.iter().enumerate() {
            let source = fs::read(&input.path)
                .with_context(|| format!("read: {}", input.path.display()))?;
            let tree = self
                .parser
                .parse(&source, None)
                .ok_or_else(|| anyhow!("unable to parse: {}", input.path.display()))?;
            let mut walk = FileWalk::new(stream, &source, reporter);
            walk.run(tree.root_node())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct VarInfo {
    tag: Option<String>,
    is_local: bool,
    is_function: bool,
}

#[derive(Debug, Default)]
struct Scope {
    vars: HashMap<String, VarInfo>,
    /// Struct/union tags declared at this scope; value = declared locally.
    tags: HashMap<String, bool>,
    /// Typedef name -> underlying aggregate tag.
    typedefs: HashMap<String, String>,
}

struct FileWalk<'a, 'r> {
    stream: usize,
    source: &'a [u8],
    reporter: &'r mut dyn Reporter,
    /// Identifier of the enclosing top-level definition.
    context: Option<String>,
    scopes: Vec<Scope>,
}

/// Shift the VAL pair of `mode` onto the PTR pair: dereferencing turns a
/// value access into a pointee access on the operand.
fn deref_mode(mode: u32) -> u32 {
    let shifted = (mode & (R_VAL | W_VAL)) << SHIFT;
    if shifted == 0 {
        R_PTR
    } else {
        shifted
    }
}

fn is_statement(kind: &str) -> bool {
    kind.ends_with("_statement")
        || matches!(kind, "declaration" | "type_definition" | "else_clause")
}

/// Descend a declarator to its defining identifier. The second element
/// is true for plain function declarators (not function pointers).
fn declarator_ident(node: Node<'_>) -> Option<(Node<'_>, bool)> {
    match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" => Some((node, false)),
        "function_declarator" => {
            let inner = node.child_by_field_name("declarator")?;
            let plain = inner.kind() == "identifier";
            declarator_ident(inner).map(|(n, _)| (n, plain))
        }
        "pointer_declarator" | "array_declarator" | "parenthesized_declarator" => {
            let inner = node
                .child_by_field_name("declarator")
                .or_else(|| node.named_child(0))?;
            declarator_ident(inner)
        }
        _ => None,
    }
}

/// Find the function_declarator carrying the parameter list.
fn function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "function_declarator" => Some(node),
        "pointer_declarator" | "parenthesized_declarator" => {
            let inner = node
                .child_by_field_name("declarator")
                .or_else(|| node.named_child(0))?;
            function_declarator(inner)
        }
        _ => None,
    }
}

impl<'a, 'r> FileWalk<'a, 'r> {
    fn new(stream: usize, source: &'a [u8], reporter: &'r mut dyn Reporter) -> Self {
        Self {
            stream,
            source,
            reporter,
            context: None,
            scopes: Vec::new(),
        }
    }

    fn run(&mut self, root: Node<'_>) -> Result<()> {
        self.scopes.push(Scope::default());
        self.items(root)?;
        self.scopes.pop();
        Ok(())
    }

    fn items(&mut self, node: Node<'_>) -> Result<()> {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.top_level(child)?;
        }
        Ok(())
    }

    fn top_level(&mut self, node: Node<'_>) -> Result<()> {
        match node.kind() {
            "function_definition" => self.function_definition(node),
            "declaration" => self.declaration(node, false),
            "type_definition" => self.type_definition(node, false),
            "struct_specifier" | "union_specifier" | "enum_specifier" => {
                self.type_specifier(node, false).map(|_| ())
            }
            // Conditional compilation blocks still carry top-level items.
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif" => self.items(node),
            _ => Ok(()),
        }
    }

    // === reporting helpers ===

    fn text(&self, node: Node<'_>) -> &'a str {
        std::str::from_utf8(&self.source[node.byte_range()]).unwrap_or("")
    }

    fn pos(&self, node: Node<'_>) -> Position {
        let point = node.start_position();
        Position {
            stream: self.stream,
            line: point.row as u32 + 1,
            column: point.column as u32 + 1,
        }
    }

    fn report_symdef(
        &mut self,
        pos: Position,
        ident: Option<&str>,
        kind: SymbolKind,
        is_local: bool,
    ) -> Result<()> {
        let ctx = self.context.clone();
        self.reporter.symdef(&SymbolEvent {
            ident,
            kind,
            pos,
            is_local,
            context: ctx.as_deref(),
        })
    }

    fn report_symbol(
        &mut self,
        mode: u32,
        pos: Position,
        ident: Option<&str>,
        kind: SymbolKind,
        is_local: bool,
    ) -> Result<()> {
        let ctx = self.context.clone();
        self.reporter.symbol(
            mode,
            pos,
            &SymbolEvent {
                ident,
                kind,
                pos,
                is_local,
                context: ctx.as_deref(),
            },
        )
    }

    fn report_member(
        &mut self,
        mode: u32,
        pos: Position,
        tag: Option<&str>,
        member: Option<Node<'_>>,
    ) -> Result<()> {
        let ctx = self.context.clone();
        let tag_local = tag.map(|t| self.tag_is_local(t)).unwrap_or(false);
        let tag_event = SymbolEvent {
            ident: tag,
            kind: SymbolKind::StructTag,
            pos,
            is_local: tag_local,
            context: ctx.as_deref(),
        };
        match member {
            Some(node) => {
                let text = self.text(node);
                let member_event = SymbolEvent {
                    ident: if text.is_empty() { None } else { Some(text) },
                    kind: SymbolKind::Member,
                    pos,
                    is_local: false,
                    context: ctx.as_deref(),
                };
                if mode == DEF {
                    self.reporter.memdef(&tag_event, &member_event)
                } else {
                    self.reporter.member(mode, pos, &tag_event, Some(&member_event))
                }
            }
            None => self.reporter.member(mode, pos, &tag_event, None),
        }
    }

    // === scope bookkeeping ===

    fn scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    fn lookup_var(&self, name: &str) -> Option<VarInfo> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.vars.get(name))
            .cloned()
    }

    fn lookup_typedef(&self, name: &str) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.typedefs.get(name))
            .cloned()
    }

    fn tag_is_local(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.tags.get(name))
            .copied()
            .unwrap_or(false)
    }

    // === declarations ===

    fn declaration(&mut self, node: Node<'_>, local: bool) -> Result<()> {
        let tag = match node.child_by_field_name("type") {
            Some(ty) => self.type_specifier(ty, local)?,
            None => None,
        };

        let mut cursor = node.walk();
        let declarators: Vec<Node<'_>> =
            node.children_by_field_name("declarator", &mut cursor).collect();
        for declarator in declarators {
            self.declare(declarator, tag.as_deref(), local)?;
        }
        Ok(())
    }

    fn declare(&mut self, node: Node<'_>, tag: Option<&str>, local: bool) -> Result<()> {
        let (value, declarator) = if node.kind() == "init_declarator" {
            (
                node.child_by_field_name("value"),
                node.child_by_field_name("declarator"),
            )
        } else {
            (None, Some(node))
        };
        let Some(declarator) = declarator else {
            return Ok(());
        };
        let Some((ident_node, is_function)) = declarator_ident(declarator) else {
            return Ok(());
        };

        let name = self.text(ident_node).to_string();
        let kind = if is_function {
            SymbolKind::Function
        } else {
            SymbolKind::Variable
        };
        self.report_symdef(self.pos(ident_node), Some(&name), kind, local)?;
        self.scope_mut().vars.insert(
            name.clone(),
            VarInfo {
                tag: if is_function {
                    None
                } else {
                    tag.map(str::to_string)
                },
                is_local: local,
                is_function,
            },
        );

        self.declarator_sizes(declarator)?;

        if let Some(value) = value {
            if local {
                self.expression(value, R_VAL)?;
            } else {
                // A top-level initializer runs in the context of the
                // definition it initializes.
                let saved = self.context.replace(name);
                let result = self.expression(value, R_VAL);
                self.context = saved;
                result?;
            }
        }
        Ok(())
    }

    /// Array extents inside a declarator are ordinary value reads.
    fn declarator_sizes(&mut self, node: Node<'_>) -> Result<()> {
        if node.kind() == "array_declarator" {
            if let Some(size) = node.child_by_field_name("size") {
                self.expression(size, R_VAL)?;
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if matches!(
                child.kind(),
                "array_declarator" | "pointer_declarator" | "parenthesized_declarator"
            ) {
                self.declarator_sizes(child)?;
            }
        }
        Ok(())
    }

    /// Process a type specifier; returns the aggregate tag (directly or
    /// through a typedef) for binding declared variables.
    fn type_specifier(&mut self, node: Node<'_>, local: bool) -> Result<Option<String>> {
        match node.kind() {
            "struct_specifier" | "union_specifier" => {
                let name_node = node.child_by_field_name("name");
                let tag = name_node.map(|n| self.text(n).to_string());

                if let Some(body) = node.child_by_field_name("body") {
                    if let (Some(name_node), Some(tag)) = (name_node, tag.as_deref()) {
                        self.report_symdef(
                            self.pos(name_node),
                            Some(tag),
                            SymbolKind::StructTag,
                            local,
                        )?;
                        self.scope_mut().tags.insert(tag.to_string(), local);
                    }
                    self.field_list(body, tag.as_deref(), local)?;
                } else if let (Some(name_node), Some(tag)) = (name_node, tag.as_deref()) {
                    // Bare tag reference (declaration, cast, sizeof):
                    // an occurrence with no access bits.
                    let is_local = self.tag_is_local(tag);
                    self.report_symbol(
                        0,
                        self.pos(name_node),
                        Some(tag),
                        SymbolKind::StructTag,
                        is_local,
                    )?;
                }
                Ok(tag)
            }
            "enum_specifier" => {
                let name_node = node.child_by_field_name("name");
                let tag = name_node.map(|n| self.text(n).to_string());

                if let Some(body) = node.child_by_field_name("body") {
                    if let (Some(name_node), Some(tag)) = (name_node, tag.as_deref()) {
                        self.report_symdef(
                            self.pos(name_node),
                            Some(tag),
                            SymbolKind::StructTag,
                            local,
                        )?;
                        self.scope_mut().tags.insert(tag.to_string(), local);
                    }
                    let mut cursor = body.walk();
                    let enumerators: Vec<Node<'_>> = body
                        .named_children(&mut cursor)
                        .filter(|c| c.kind() == "enumerator")
                        .collect();
                    for enumerator in enumerators {
                        if let Some(name) = enumerator.child_by_field_name("name") {
                            let text = self.text(name).to_string();
                            self.report_symdef(
                                self.pos(name),
                                Some(&text),
                                SymbolKind::Variable,
                                local,
                            )?;
                            self.scope_mut().vars.insert(
                                text,
                                VarInfo {
                                    tag: None,
                                    is_local: local,
                                    is_function: false,
                                },
                            );
                        }
                        if let Some(value) = enumerator.child_by_field_name("value") {
                            self.expression(value, R_VAL)?;
                        }
                    }
                } else if let (Some(name_node), Some(tag)) = (name_node, tag.as_deref()) {
                    let is_local = self.tag_is_local(tag);
                    self.report_symbol(
                        0,
                        self.pos(name_node),
                        Some(tag),
                        SymbolKind::StructTag,
                        is_local,
                    )?;
                }
                Ok(None)
            }
            "type_identifier" => Ok(self.lookup_typedef(self.text(node))),
            _ => Ok(None),
        }
    }

    fn field_list(&mut self, body: Node<'_>, tag: Option<&str>, local: bool) -> Result<()> {
        let mut cursor = body.walk();
        let fields: Vec<Node<'_>> = body
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "field_declaration")
            .collect();
        for field in fields {
            if let Some(ty) = field.child_by_field_name("type") {
                self.type_specifier(ty, local)?;
            }
            let mut cursor = field.walk();
            let declarators: Vec<Node<'_>> = field
                .children_by_field_name("declarator", &mut cursor)
                .collect();
            for declarator in declarators {
                if let Some((ident_node, _)) = declarator_ident(declarator) {
                    self.report_member(DEF, self.pos(ident_node), tag, Some(ident_node))?;
                }
            }
        }
        Ok(())
    }

    fn type_definition(&mut self, node: Node<'_>, local: bool) -> Result<()> {
        let tag = match node.child_by_field_name("type") {
            Some(ty) => self.type_specifier(ty, local)?,
            None => None,
        };

        let mut cursor = node.walk();
        let declarators: Vec<Node<'_>> =
            node.children_by_field_name("declarator", &mut cursor).collect();
        for declarator in declarators {
            if let Some((ident_node, _)) = declarator_ident(declarator) {
                let name = self.text(ident_node).to_string();
                self.report_symdef(
                    self.pos(ident_node),
                    Some(&name),
                    SymbolKind::Variable,
                    local,
                )?;
                if let Some(tag) = &tag {
                    self.scope_mut().typedefs.insert(name, tag.clone());
                }
            }
        }
        Ok(())
    }

    fn function_definition(&mut self, node: Node<'_>) -> Result<()> {
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return Ok(());
        };
        let Some((ident_node, _)) = declarator_ident(declarator) else {
            return Ok(());
        };
        let name = self.text(ident_node).to_string();

        self.report_symdef(self.pos(ident_node), Some(&name), SymbolKind::Function, false)?;
        self.scope_mut().vars.insert(
            name.clone(),
            VarInfo {
                tag: None,
                is_local: false,
                is_function: true,
            },
        );

        self.scopes.push(Scope::default());
        self.context = Some(name);

        if let Some(fn_declarator) = function_declarator(declarator) {
            if let Some(params) = fn_declarator.child_by_field_name("parameters") {
                let mut cursor = params.walk();
                let decls: Vec<Node<'_>> = params
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "parameter_declaration")
                    .collect();
                for param in decls {
                    let tag = match param.child_by_field_name("type") {
                        Some(ty) => self.type_specifier(ty, true)?,
                        None => None,
                    };
                    if let Some(declarator) = param.child_by_field_name("declarator") {
                        if let Some((ident_node, _)) = declarator_ident(declarator) {
                            let pname = self.text(ident_node).to_string();
                            self.report_symdef(
                                self.pos(ident_node),
                                Some(&pname),
                                SymbolKind::Variable,
                                true,
                            )?;
                            self.scope_mut().vars.insert(
                                pname,
                                VarInfo {
                                    tag,
                                    is_local: true,
                                    is_function: false,
                                },
                            );
                        }
                    }
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.statement(body)?;
        }

        self.context = None;
        self.scopes.pop();
        Ok(())
    }

    // === statements ===

    fn statement(&mut self, node: Node<'_>) -> Result<()> {
        match node.kind() {
            "compound_statement" => {
                self.scopes.push(Scope::default());
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.statement(child)?;
                }
                self.scopes.pop();
                Ok(())
            }
            "declaration" => self.declaration(node, true),
            "type_definition" => self.type_definition(node, true),
            "struct_specifier" | "union_specifier" | "enum_specifier" => {
                self.type_specifier(node, true).map(|_| ())
            }
            kind if is_statement(kind) => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for child in children {
                    if is_statement(child.kind()) {
                        self.statement(child)?;
                    } else {
                        self.expression(child, R_VAL)?;
                    }
                }
                Ok(())
            }
            _ => self.expression(node, R_VAL),
        }
    }

    // === expressions ===

    fn expression(&mut self, node: Node<'_>, mode: u32) -> Result<()> {
        match node.kind() {
            "identifier" => self.identifier_use(node, mode, true),
            "field_expression" => self.field_expression(node, mode),
            "assignment_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| o.kind())
                    .unwrap_or("=");
                let lhs_mode = if op == "=" { W_VAL } else { R_VAL | W_VAL };
                if let Some(left) = node.child_by_field_name("left") {
                    self.expression(left, lhs_mode)?;
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.expression(right, R_VAL)?;
                }
                Ok(())
            }
            "update_expression" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    self.expression(argument, R_VAL | W_VAL)?;
                }
                Ok(())
            }
            "pointer_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| o.kind())
                    .unwrap_or("*");
                if let Some(argument) = node.child_by_field_name("argument") {
                    match op {
                        "&" => self.expression(argument, R_AOF)?,
                        _ => self.expression(argument, deref_mode(mode))?,
                    }
                }
                Ok(())
            }
            "subscript_expression" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    self.expression(argument, deref_mode(mode))?;
                }
                if let Some(index) = node.child_by_field_name("index") {
                    self.expression(index, R_VAL)?;
                }
                Ok(())
            }
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    if function.kind() == "identifier" {
                        let name = self.text(function);
                        let is_local = self
                            .lookup_var(name)
                            .map(|info| info.is_local)
                            .unwrap_or(false);
                        let pos = self.pos(function);
                        let name = name.to_string();
                        self.report_symbol(
                            R_VAL,
                            pos,
                            Some(&name),
                            SymbolKind::Function,
                            is_local,
                        )?;
                    } else {
                        self.expression(function, R_VAL)?;
                    }
                }
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    let mut cursor = arguments.walk();
                    let args: Vec<Node<'_>> = arguments.named_children(&mut cursor).collect();
                    for arg in args {
                        self.expression(arg, R_VAL)?;
                    }
                }
                Ok(())
            }
            "cast_expression" => {
                if let Some(ty) = node.child_by_field_name("type") {
                    self.type_descriptor(ty)?;
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.expression(value, mode)?;
                }
                Ok(())
            }
            "sizeof_expression" => {
                if let Some(ty) = node.child_by_field_name("type") {
                    self.type_descriptor(ty)?;
                }
                if let Some(value) = node.child_by_field_name("value") {
                    // sizeof does not evaluate its operand.
                    self.expression(value, 0)?;
                }
                Ok(())
            }
            "conditional_expression" => {
                if let Some(condition) = node.child_by_field_name("condition") {
                    self.expression(condition, R_VAL)?;
                }
                if let Some(consequence) = node.child_by_field_name("consequence") {
                    self.expression(consequence, mode)?;
                }
                if let Some(alternative) = node.child_by_field_name("alternative") {
                    self.expression(alternative, mode)?;
                }
                Ok(())
            }
            "comma_expression" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.expression(left, R_VAL)?;
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.expression(right, mode)?;
                }
                Ok(())
            }
            "parenthesized_expression" => {
                if let Some(inner) = node.named_child(0) {
                    self.expression(inner, mode)?;
                }
                Ok(())
            }
            "string_literal" | "number_literal" | "char_literal" | "concatenated_string"
            | "true" | "false" | "null" | "comment" => Ok(()),
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.expression(child, R_VAL)?;
                }
                Ok(())
            }
        }
    }

    fn type_descriptor(&mut self, node: Node<'_>) -> Result<()> {
        if let Some(ty) = node.child_by_field_name("type") {
            self.type_specifier(ty, true)?;
        }
        Ok(())
    }

    /// Report a plain identifier use. When the identifier names a known
    /// aggregate-typed variable and stands on its own, the whole
    /// aggregate is accessed and a `tag.*` member record accompanies it.
    fn identifier_use(&mut self, node: Node<'_>, mode: u32, whole_aggregate: bool) -> Result<()> {
        let name = self.text(node);
        if name.is_empty() {
            return Ok(());
        }
        let info = self.lookup_var(name);
        let kind = match &info {
            Some(info) if info.is_function => SymbolKind::Function,
            _ => SymbolKind::Variable,
        };
        let is_local = info.as_ref().map(|i| i.is_local).unwrap_or(false);
        let pos = self.pos(node);
        let name = name.to_string();
        self.report_symbol(mode, pos, Some(&name), kind, is_local)?;

        if whole_aggregate {
            if let Some(tag) = info.and_then(|i| i.tag) {
                self.report_member(mode, pos, Some(&tag), None)?;
            }
        }
        Ok(())
    }

    fn field_expression(&mut self, node: Node<'_>, mode: u32) -> Result<()> {
        let Some(base) = node.child_by_field_name("argument") else {
            return Ok(());
        };
        let field = node.child_by_field_name("field");
        let op = node
            .child_by_field_name("operator")
            .map(|o| o.kind())
            .unwrap_or(".");

        let tag = if base.kind() == "identifier" {
            self.lookup_var(self.text(base)).and_then(|info| info.tag)
        } else {
            None
        };

        if let Some(field) = field {
            self.report_member(mode, self.pos(field), tag.as_deref(), Some(field))?;
        }

        if base.kind() == "identifier" {
            let base_mode = if op == "->" { deref_mode(mode) } else { R_VAL };
            self.identifier_use(base, base_mode, false)?;
        } else {
            self.expression(base, R_VAL)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::mode::{W_PTR, W_VAL};

    /// Captures normalized events the way the indexing sink would.
    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Event {
        mode: u32,
        line: u32,
        column: u32,
        symbol: String,
        kind: u8,
        context: String,
        is_local: bool,
    }

    impl Reporter for Recorder {
        fn symbol(&mut self, mode: u32, pos: Position, sym: &SymbolEvent<'_>) -> Result<()> {
            self.events.push(Event {
                mode,
                line: pos.line,
                column: pos.column,
                symbol: sym.ident.unwrap_or("").to_string(),
                kind: sym.kind.code(),
                context: sym.context.unwrap_or("").to_string(),
                is_local: sym.is_local,
            });
            Ok(())
        }

        fn member(
            &mut self,
            mode: u32,
            pos: Position,
            tag: &SymbolEvent<'_>,
            member: Option<&SymbolEvent<'_>>,
        ) -> Result<()> {
            let tag_name = tag.ident.unwrap_or("?");
            let member_name = match member {
                Some(m) => m.ident.unwrap_or("?"),
                None => "*",
            };
            self.events.push(Event {
                mode,
                line: pos.line,
                column: pos.column,
                symbol: format!("{}.{}", tag_name, member_name),
                kind: b'm',
                context: tag.context.unwrap_or("").to_string(),
                is_local: tag.is_local,
            });
            Ok(())
        }
    }

    fn dissect_source(source: &str) -> Vec<Event> {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("t.c");
        std::fs::write(&path, source).unwrap();

        let mut dissector = Dissector::new().unwrap();
        let mut recorder = Recorder::default();
        dissector
            .dissect(&[InputStream { path }], &mut recorder)
            .unwrap();
        recorder.events
    }

    fn find<'e>(events: &'e [Event], symbol: &str, mode: u32) -> &'e Event {
        events
            .iter()
            .find(|e| e.symbol == symbol && e.mode == mode)
            .unwrap_or_else(|| panic!("no event for {} mode {:#x}: {:#?}", symbol, mode, events))
    }

    #[test]
    fn definitions_and_value_read() {
        let events = dissect_source("int x;\nint f(void){ return x; }\n");

        let xdef = find(&events, "x", DEF);
        assert_eq!((xdef.line, xdef.column, xdef.kind), (1, 5, b'v'));
        assert_eq!(xdef.context, "");
        assert!(!xdef.is_local);

        let fdef = find(&events, "f", DEF);
        assert_eq!((fdef.line, fdef.column, fdef.kind), (2, 5, b'f'));

        let xuse = find(&events, "x", R_VAL);
        assert_eq!((xuse.line, xuse.column), (2, 21));
        assert_eq!(xuse.context, "f");
    }

    #[test]
    fn assignment_modes() {
        let events = dissect_source("int a;\nvoid g(void) { a = 1; a += 2; a++; }\n");

        find(&events, "a", DEF);
        let w = find(&events, "a", W_VAL);
        assert_eq!(w.context, "g");
        // Compound assignment and the increment both read and write.
        assert_eq!(
            events
                .iter()
                .filter(|e| e.symbol == "a" && e.mode == (R_VAL | W_VAL))
                .count(),
            2
        );
    }

    #[test]
    fn pointer_modes() {
        let events = dissect_source("void h(int *p) { *p = 3; int y = *p; }\n");

        let pdef = find(&events, "p", DEF);
        assert!(pdef.is_local);
        find(&events, "p", W_PTR);
        find(&events, "p", R_PTR);
        let ydef = find(&events, "y", DEF);
        assert!(ydef.is_local);
    }

    #[test]
    fn address_of_in_toplevel_initializer() {
        let events = dissect_source("int b;\nint *q = &b;\n");

        let aof = find(&events, "b", R_AOF);
        assert_eq!(aof.context, "q");
        find(&events, "q", DEF);
    }

    #[test]
    fn struct_members() {
        let events = dissect_source(
            "struct point { int x; int y; };\nstruct point pt;\nvoid k(void) { pt.x = 5; }\n",
        );

        let tag = find(&events, "point", DEF);
        assert_eq!(tag.kind, b's');
        find(&events, "point.x", DEF);
        find(&events, "point.y", DEF);
        // Declaring `struct point pt` references the tag without access.
        let bare = find(&events, "point", 0);
        assert_eq!(bare.line, 2);

        let write = find(&events, "point.x", W_VAL);
        assert_eq!(write.context, "k");
        // The base variable is read to reach the member.
        let base = find(&events, "pt", R_VAL);
        assert_eq!(base.context, "k");
    }

    #[test]
    fn whole_aggregate_access() {
        let events = dissect_source(
            "struct point { int x; };\nstruct point p1, p2;\nvoid m2(void) { p1 = p2; }\n",
        );

        find(&events, "point.*", W_VAL);
        find(&events, "point.*", R_VAL);
        find(&events, "p1", W_VAL);
        find(&events, "p2", R_VAL);
    }

    #[test]
    fn arrow_access_through_pointer() {
        let events =
            dissect_source("struct point { int y; };\nvoid n(struct point *pp) { pp->y = 1; }\n");

        find(&events, "point.y", W_VAL);
        find(&events, "pp", W_PTR);
    }

    #[test]
    fn typedef_resolves_member_tags() {
        let events = dissect_source(
            "typedef struct point { int x; } point_t;\npoint_t pt;\nint r(void) { return pt.x; }\n",
        );

        find(&events, "point_t", DEF);
        let read = find(&events, "point.x", R_VAL);
        assert_eq!(read.context, "r");
    }

    #[test]
    fn unknown_aggregate_renders_question_mark() {
        let events = dissect_source("void q(void) { extern int e[1]; }\nint s2(int *u) { return u->x; }\n");
        // `u` has no known aggregate type; the member record falls back
        // to the `?` tag.
        let read = find(&events, "?.x", R_VAL);
        assert_eq!(read.context, "s2");
    }

    #[test]
    fn calls_and_prototypes() {
        let events = dissect_source("int add(int u, int v);\nint use2(void) { return add(1, 2); }\n");

        let proto = find(&events, "add", DEF);
        assert_eq!(proto.kind, b'f');
        let call = find(&events, "add", R_VAL);
        assert_eq!(call.kind, b'f');
        assert_eq!(call.context, "use2");
    }

    #[test]
    fn enums_define_tag_and_constants() {
        let events = dissect_source("enum color { RED, GREEN };\nint c2 = RED;\n");

        let tag = find(&events, "color", DEF);
        assert_eq!(tag.kind, b's');
        let red = find(&events, "RED", DEF);
        assert_eq!(red.kind, b'v');
        let read = find(&events, "RED", R_VAL);
        assert_eq!(read.context, "c2");
    }

    #[test]
    fn locals_are_flagged() {
        let events = dissect_source("void t(void) { int inner = 0; inner = 1; }\n");

        let def = find(&events, "inner", DEF);
        assert!(def.is_local);
        let write = find(&events, "inner", W_VAL);
        assert!(write.is_local);
    }

    #[test]
    fn duplicate_emissions_are_possible() {
        // The same point can be reported twice across branches of the
        // walk; the index coalesces, the frontend does not have to.
        let events = dissect_source("int z;\nvoid d(void) { z = z; }\n");
        find(&events, "z", W_VAL);
        find(&events, "z", R_VAL);
    }
}
