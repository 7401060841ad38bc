//! Lowers a tree-sitter JS/TS concrete syntax tree into the engine's
//! annotated [`Ast`] (§4.A). This is the reference implementation of
//! the "parser" half of the external collaborator spec.md §1
//! describes — it covers the constructs the rule set in §4.E actually
//! touches; anything else lowers to [`NodeKind::Unknown`] carrying its
//! own source slice verbatim, so a construct the engine doesn't model
//! degrades gracefully instead of panicking.

use tree_sitter::Node as TsNode;

use crate::ast::node::{MethodKind, Node, NodeId, NodeKind, ParentKey, Range, VarKind};
use crate::ast::scope::{ScopeId, ScopeTree};
use crate::ast::{Ast, LiteralValue};
use crate::error::{RestringerError, Result};

struct Lowerer<'src> {
    source: &'src str,
    nodes: Vec<Node>,
}

impl<'src> Lowerer<'src> {
    fn text(&self, ts: TsNode) -> &'src str {
        &self.source[ts.start_byte()..ts.end_byte()]
    }

    fn range(&self, ts: TsNode) -> Range {
        Range::new(ts.start_byte() as u32, ts.end_byte() as u32)
    }

    /// Allocates a node, wiring up the parent link the caller already
    /// knows (the parent's own id isn't assigned yet for top-down
    /// construction, so callers pass it in explicitly and fix up
    /// `parent`/`parent_key` once the child id is known).
    fn alloc(&mut self, kind: NodeKind, range: Range, src: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            kind,
            range,
            src: src.to_string(),
            parent: None,
            parent_key: ParentKey::Root,
            scope: ScopeId::root(),
            decl_node: None,
            references: Vec::new(),
            lineage: Vec::new(),
        });
        id
    }

    fn set_parent(&mut self, child: NodeId, parent: NodeId, key: ParentKey) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[child.index()].parent_key = key;
    }

    /// Lowers one tree-sitter node to an expression `NodeId`, unwrapping
    /// parenthesized expressions and skipping comments.
    fn lower_expr(&mut self, ts: TsNode) -> NodeId {
        let range = self.range(ts);
        let src = self.text(ts);
        match ts.kind() {
            "parenthesized_expression" => {
                if let Some(inner) = first_named(ts) {
                    self.lower_expr(inner)
                } else {
                    self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src)
                }
            }
            "identifier" | "property_identifier" | "shorthand_property_identifier" => {
                self.alloc(NodeKind::Identifier { name: src.to_string() }, range, src)
            }
            "this" => self.alloc(NodeKind::ThisExpression, range, src),
            "number" => {
                let value = src.replace('_', "").parse::<f64>().unwrap_or(f64::NAN);
                self.alloc(NodeKind::Literal(LiteralValue::Number(value)), range, src)
            }
            "string" | "template_string" if ts.kind() == "string" => {
                self.alloc(NodeKind::Literal(LiteralValue::Str(unquote(src))), range, src)
            }
            "true" | "false" => {
                self.alloc(NodeKind::Literal(LiteralValue::Bool(src == "true")), range, src)
            }
            "null" => self.alloc(NodeKind::Literal(LiteralValue::Null), range, src),
            "regex" => {
                let (pattern, flags) = split_regex(src);
                self.alloc(
                    NodeKind::Literal(LiteralValue::Regex { pattern, flags }),
                    range,
                    src,
                )
            }
            "template_string" => self.lower_template_literal(ts, range, src),
            "member_expression" => self.lower_member(ts, range, src, false),
            "subscript_expression" => self.lower_member(ts, range, src, true),
            "call_expression" => self.lower_call(ts, range, src),
            "new_expression" => self.lower_new(ts, range, src),
            "assignment_expression" | "augmented_assignment_expression" => {
                self.lower_assignment(ts, range, src)
            }
            "binary_expression" => self.lower_binary(ts, range, src),
            "unary_expression" => self.lower_unary(ts, range, src),
            "update_expression" => self.lower_update(ts, range, src),
            "ternary_expression" => self.lower_ternary(ts, range, src),
            "sequence_expression" => self.lower_sequence(ts, range, src),
            "array" => self.lower_array(ts, range, src),
            "object" => self.lower_object(ts, range, src),
            "function_expression" | "function" | "generator_function" => {
                self.lower_function(ts, range, src, false)
            }
            "arrow_function" => self.lower_arrow(ts, range, src),
            _ => self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src),
        }
    }

    fn lower_template_literal(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        let mut current_quasi = String::new();
        let mut cursor = ts.walk();
        for child in ts.children(&mut cursor) {
            match child.kind() {
                "string_fragment" => current_quasi.push_str(self.text(child)),
                "template_substitution" => {
                    quasis.push(std::mem::take(&mut current_quasi));
                    if let Some(inner) = first_named(child) {
                        expressions.push(self.lower_expr(inner));
                    }
                }
                "`" => {}
                _ => current_quasi.push_str(self.text(child)),
            }
        }
        quasis.push(current_quasi);
        let expr_ids = expressions.clone();
        let id = self.alloc(NodeKind::TemplateLiteral { quasis, expressions }, range, src);
        for (i, e) in expr_ids.into_iter().enumerate() {
            self.set_parent(e, id, ParentKey::Index("expressions", i));
        }
        id
    }

    fn lower_member(&mut self, ts: TsNode, range: Range, src: &'src str, computed: bool) -> NodeId {
        let object_ts = ts.child_by_field_name("object");
        let prop_ts = if computed {
            ts.child_by_field_name("index")
        } else {
            ts.child_by_field_name("property")
        };
        let object = object_ts.map(|n| self.lower_expr(n));
        let property = prop_ts.map(|n| {
            if computed {
                self.lower_expr(n)
            } else {
                let r = self.range(n);
                let t = self.text(n);
                self.alloc(NodeKind::Identifier { name: t.to_string() }, r, t)
            }
        });
        let (object, property) = match (object, property) {
            (Some(o), Some(p)) => (o, p),
            _ => return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src),
        };
        let id = self.alloc(NodeKind::MemberExpression { object, property, computed }, range, src);
        self.set_parent(object, id, ParentKey::Field("object"));
        self.set_parent(property, id, ParentKey::Field("property"));
        id
    }

    fn lower_call(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let Some(callee_ts) = ts.child_by_field_name("function") else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let callee = self.lower_expr(callee_ts);
        let args = self.lower_arguments(ts.child_by_field_name("arguments"));
        let id = self.alloc(NodeKind::CallExpression { callee, arguments: args.clone() }, range, src);
        self.set_parent(callee, id, ParentKey::Field("callee"));
        for (i, a) in args.into_iter().enumerate() {
            self.set_parent(a, id, ParentKey::Index("arguments", i));
        }
        id
    }

    fn lower_new(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let Some(callee_ts) = ts.child_by_field_name("constructor") else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let callee = self.lower_expr(callee_ts);
        let args = self.lower_arguments(ts.child_by_field_name("arguments"));
        let id = self.alloc(NodeKind::NewExpression { callee, arguments: args.clone() }, range, src);
        self.set_parent(callee, id, ParentKey::Field("callee"));
        for (i, a) in args.into_iter().enumerate() {
            self.set_parent(a, id, ParentKey::Index("arguments", i));
        }
        id
    }

    fn lower_arguments(&mut self, args_ts: Option<TsNode>) -> Vec<NodeId> {
        let Some(args_ts) = args_ts else { return Vec::new() };
        let mut cursor = args_ts.walk();
        args_ts
            .named_children(&mut cursor)
            .map(|c| self.lower_expr(c))
            .collect()
    }

    fn lower_assignment(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let operator = operator_text(ts, src).unwrap_or_else(|| "=".to_string());
        let (Some(left_ts), Some(right_ts)) =
            (ts.child_by_field_name("left"), ts.child_by_field_name("right"))
        else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let left = self.lower_expr(left_ts);
        let right = self.lower_expr(right_ts);
        let id = self.alloc(NodeKind::AssignmentExpression { operator, left, right }, range, src);
        self.set_parent(left, id, ParentKey::Field("left"));
        self.set_parent(right, id, ParentKey::Field("right"));
        id
    }

    fn lower_binary(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let operator = operator_text(ts, src).unwrap_or_default();
        let (Some(left_ts), Some(right_ts)) =
            (ts.child_by_field_name("left"), ts.child_by_field_name("right"))
        else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let left = self.lower_expr(left_ts);
        let right = self.lower_expr(right_ts);
        let is_logical = matches!(operator.as_str(), "&&" | "||" | "??");
        let id = if is_logical {
            self.alloc(NodeKind::LogicalExpression { operator, left, right }, range, src)
        } else {
            self.alloc(NodeKind::BinaryExpression { operator, left, right }, range, src)
        };
        self.set_parent(left, id, ParentKey::Field("left"));
        self.set_parent(right, id, ParentKey::Field("right"));
        id
    }

    fn lower_unary(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let operator = operator_text(ts, src).unwrap_or_default();
        let Some(arg_ts) = ts.child_by_field_name("argument") else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let argument = self.lower_expr(arg_ts);
        let id = self.alloc(NodeKind::UnaryExpression { operator, argument }, range, src);
        self.set_parent(argument, id, ParentKey::Field("argument"));
        id
    }

    fn lower_update(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let Some(arg_ts) = ts.child_by_field_name("argument") else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let argument = self.lower_expr(arg_ts);
        // `argument` is a named field in both shapes; the operator token
        // itself is anonymous, so prefix/postfix is read off whichever
        // side of the node the argument starts on instead.
        let prefix = arg_ts.start_byte() != ts.start_byte();
        let operator = operator_text(ts, src).unwrap_or_default();
        let id = self.alloc(NodeKind::UpdateExpression { operator, argument, prefix }, range, src);
        self.set_parent(argument, id, ParentKey::Field("argument"));
        id
    }

    fn lower_ternary(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let fields = (
            ts.child_by_field_name("condition"),
            ts.child_by_field_name("consequence"),
            ts.child_by_field_name("alternative"),
        );
        let (Some(t), Some(c), Some(a)) = fields else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let test = self.lower_expr(t);
        let consequent = self.lower_expr(c);
        let alternate = self.lower_expr(a);
        let id = self.alloc(
            NodeKind::ConditionalExpression { test, consequent, alternate },
            range,
            src,
        );
        self.set_parent(test, id, ParentKey::Field("test"));
        self.set_parent(consequent, id, ParentKey::Field("consequent"));
        self.set_parent(alternate, id, ParentKey::Field("alternate"));
        id
    }

    fn lower_sequence(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let mut expressions = Vec::new();
        flatten_sequence(self, ts, &mut expressions);
        let id = self.alloc(NodeKind::SequenceExpression { expressions: expressions.clone() }, range, src);
        for (i, e) in expressions.into_iter().enumerate() {
            self.set_parent(e, id, ParentKey::Index("expressions", i));
        }
        id
    }

    fn lower_array(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let mut cursor = ts.walk();
        let elements: Vec<Option<NodeId>> = ts
            .named_children(&mut cursor)
            .map(|c| if c.kind() == "," { None } else { Some(self.lower_expr(c)) })
            .collect();
        let ids = elements.clone();
        let id = self.alloc(NodeKind::ArrayExpression { elements }, range, src);
        for (i, e) in ids.into_iter().enumerate() {
            if let Some(e) = e {
                self.set_parent(e, id, ParentKey::Index("elements", i));
            }
        }
        id
    }

    fn lower_object(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let mut cursor = ts.walk();
        let mut properties = Vec::new();
        for child in ts.named_children(&mut cursor) {
            match child.kind() {
                "pair" => {
                    let key_ts = child.child_by_field_name("key");
                    let value_ts = child.child_by_field_name("value");
                    if let (Some(k), Some(v)) = (key_ts, value_ts) {
                        let computed = k.kind() == "computed_property_name";
                        let key = if computed {
                            first_named(k).map(|n| self.lower_expr(n)).unwrap_or_else(|| {
                                self.alloc(NodeKind::Unknown { ts_kind: "computed_property_name".into() }, self.range(k), self.text(k))
                            })
                        } else if k.kind() == "string" {
                            self.lower_expr(k)
                        } else {
                            let r = self.range(k);
                            let t = self.text(k);
                            self.alloc(NodeKind::Identifier { name: t.to_string() }, r, t)
                        };
                        let value = self.lower_expr(v);
                        let prop_range = self.range(child);
                        let prop_src = self.text(child);
                        let prop_id = self.alloc(
                            NodeKind::Property { key, value, computed, shorthand: false },
                            prop_range,
                            prop_src,
                        );
                        self.set_parent(key, prop_id, ParentKey::Field("key"));
                        self.set_parent(value, prop_id, ParentKey::Field("value"));
                        properties.push(prop_id);
                    }
                }
                "shorthand_property_identifier" => {
                    let r = self.range(child);
                    let t = self.text(child);
                    let key = self.alloc(NodeKind::Identifier { name: t.to_string() }, r, t);
                    let value = self.alloc(NodeKind::Identifier { name: t.to_string() }, r, t);
                    let prop_id = self.alloc(
                        NodeKind::Property { key, value, computed: false, shorthand: true },
                        r,
                        t,
                    );
                    self.set_parent(key, prop_id, ParentKey::Field("key"));
                    self.set_parent(value, prop_id, ParentKey::Field("value"));
                    properties.push(prop_id);
                }
                "method_definition" => {
                    if let Some(p) = self.lower_method(child) {
                        properties.push(p);
                    }
                }
                _ => {}
            }
        }
        let ids = properties.clone();
        let id = self.alloc(NodeKind::ObjectExpression { properties }, range, src);
        for (i, p) in ids.into_iter().enumerate() {
            self.set_parent(p, id, ParentKey::Index("properties", i));
        }
        id
    }

    fn lower_method(&mut self, ts: TsNode) -> Option<NodeId> {
        let name_ts = ts.child_by_field_name("name")?;
        let body_ts = ts.child_by_field_name("body")?;
        let params = self.lower_params(ts.child_by_field_name("parameters"));
        let body = self.lower_stmt(body_ts);
        let range = self.range(ts);
        let src = self.text(ts);
        let key_r = self.range(name_ts);
        let key_t = self.text(name_ts);
        let key = self.alloc(NodeKind::Identifier { name: key_t.to_string() }, key_r, key_t);
        let func = self.alloc(
            NodeKind::FunctionExpression { id: None, params: params.clone(), body },
            range,
            src,
        );
        self.set_parent(body, func, ParentKey::Field("body"));
        for (i, p) in params.into_iter().enumerate() {
            self.set_parent(p, func, ParentKey::Index("params", i));
        }
        let kind = method_kind(self.text(ts));
        let id = self.alloc(
            NodeKind::MethodDefinition { key, value: func, computed: false, kind },
            range,
            src,
        );
        self.set_parent(key, id, ParentKey::Field("key"));
        self.set_parent(func, id, ParentKey::Field("value"));
        Some(id)
    }

    fn lower_params(&mut self, params_ts: Option<TsNode>) -> Vec<NodeId> {
        let Some(params_ts) = params_ts else { return Vec::new() };
        let mut cursor = params_ts.walk();
        params_ts
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "identifier")
            .map(|c| {
                let r = self.range(c);
                let t = self.text(c);
                self.alloc(NodeKind::Identifier { name: t.to_string() }, r, t)
            })
            .collect()
    }

    fn lower_function(&mut self, ts: TsNode, range: Range, src: &'src str, declaration: bool) -> NodeId {
        let name_ts = ts.child_by_field_name("name");
        let params = self.lower_params(ts.child_by_field_name("parameters"));
        let Some(body_ts) = ts.child_by_field_name("body") else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let body = self.lower_stmt(body_ts);
        let name_id = name_ts.map(|n| {
            let r = self.range(n);
            let t = self.text(n);
            self.alloc(NodeKind::Identifier { name: t.to_string() }, r, t)
        });
        let id = if declaration {
            self.alloc(
                NodeKind::FunctionDeclaration { id: name_id, params: params.clone(), body },
                range,
                src,
            )
        } else {
            self.alloc(
                NodeKind::FunctionExpression { id: name_id, params: params.clone(), body },
                range,
                src,
            )
        };
        if let Some(n) = name_id {
            self.set_parent(n, id, ParentKey::Field("id"));
        }
        self.set_parent(body, id, ParentKey::Field("body"));
        for (i, p) in params.into_iter().enumerate() {
            self.set_parent(p, id, ParentKey::Index("params", i));
        }
        id
    }

    fn lower_arrow(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let params = if let Some(p) = ts.child_by_field_name("parameters") {
            self.lower_params(Some(p))
        } else if let Some(p) = ts.child_by_field_name("parameter") {
            let r = self.range(p);
            let t = self.text(p);
            vec![self.alloc(NodeKind::Identifier { name: t.to_string() }, r, t)]
        } else {
            Vec::new()
        };
        let Some(body_ts) = ts.child_by_field_name("body") else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let expression_body = body_ts.kind() != "statement_block";
        let body = if expression_body {
            self.lower_expr(body_ts)
        } else {
            self.lower_stmt(body_ts)
        };
        let id = self.alloc(
            NodeKind::ArrowFunctionExpression { params: params.clone(), body, expression_body },
            range,
            src,
        );
        self.set_parent(body, id, ParentKey::Field("body"));
        for (i, p) in params.into_iter().enumerate() {
            self.set_parent(p, id, ParentKey::Index("params", i));
        }
        id
    }

    fn lower_stmt(&mut self, ts: TsNode) -> NodeId {
        let range = self.range(ts);
        let src = self.text(ts);
        match ts.kind() {
            "statement_block" => {
                let mut cursor = ts.walk();
                let body: Vec<NodeId> = ts.named_children(&mut cursor).map(|c| self.lower_stmt(c)).collect();
                let id = self.alloc(NodeKind::BlockStatement { body: body.clone() }, range, src);
                for (i, s) in body.into_iter().enumerate() {
                    self.set_parent(s, id, ParentKey::Index("body", i));
                }
                id
            }
            "expression_statement" => {
                let Some(inner) = first_named(ts) else {
                    return self.alloc(NodeKind::EmptyStatement, range, src);
                };
                let expression = self.lower_expr(inner);
                let id = self.alloc(NodeKind::ExpressionStatement { expression }, range, src);
                self.set_parent(expression, id, ParentKey::Field("expression"));
                id
            }
            "empty_statement" | ";" => self.alloc(NodeKind::EmptyStatement, range, src),
            "variable_declaration" | "lexical_declaration" => self.lower_var_decl(ts, range, src),
            "function_declaration" | "generator_function_declaration" => {
                self.lower_function(ts, range, src, true)
            }
            "return_statement" => {
                let argument = first_named(ts).map(|n| self.lower_expr(n));
                let id = self.alloc(NodeKind::ReturnStatement { argument }, range, src);
                if let Some(a) = argument {
                    self.set_parent(a, id, ParentKey::Field("argument"));
                }
                id
            }
            "break_statement" => {
                let label = first_named(ts).map(|n| self.text(n).to_string());
                self.alloc(NodeKind::BreakStatement { label }, range, src)
            }
            "if_statement" => self.lower_if(ts, range, src),
            "for_statement" => self.lower_for(ts, range, src),
            "for_in_statement" => self.lower_for_in(ts, range, src),
            "while_statement" => self.lower_while(ts, range, src),
            "do_statement" => self.lower_do_while(ts, range, src),
            "switch_statement" => self.lower_switch(ts, range, src),
            "class_declaration" => self.lower_class(ts, range, src),
            _ => self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src),
        }
    }

    fn lower_var_decl(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let kind = if src.trim_start().starts_with("const") {
            VarKind::Const
        } else if src.trim_start().starts_with("let") {
            VarKind::Let
        } else {
            VarKind::Var
        };
        let mut cursor = ts.walk();
        let mut declarations = Vec::new();
        for child in ts.named_children(&mut cursor) {
            if child.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_ts) = child.child_by_field_name("name") else { continue };
            let name_id = self.lower_expr(name_ts);
            let init = child.child_by_field_name("value").map(|v| self.lower_expr(v));
            let d_range = self.range(child);
            let d_src = self.text(child);
            let decl_id = self.alloc(NodeKind::VariableDeclarator { id: name_id, init }, d_range, d_src);
            self.set_parent(name_id, decl_id, ParentKey::Field("id"));
            if let Some(i) = init {
                self.set_parent(i, decl_id, ParentKey::Field("init"));
            }
            declarations.push(decl_id);
        }
        let ids = declarations.clone();
        let id = self.alloc(NodeKind::VariableDeclaration { kind, declarations }, range, src);
        for (i, d) in ids.into_iter().enumerate() {
            self.set_parent(d, id, ParentKey::Index("declarations", i));
        }
        id
    }

    fn lower_if(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let Some(cond_ts) = ts.child_by_field_name("condition").and_then(first_named) else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let Some(cons_ts) = ts.child_by_field_name("consequence") else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let test = self.lower_expr(cond_ts);
        let consequent = self.lower_stmt(cons_ts);
        let alternate = ts
            .child_by_field_name("alternative")
            .map(|a| {
                if a.kind() == "else_clause" {
                    first_named(a).map(|n| self.lower_stmt(n))
                } else {
                    Some(self.lower_stmt(a))
                }
            })
            .flatten();
        let id = self.alloc(NodeKind::IfStatement { test, consequent, alternate }, range, src);
        self.set_parent(test, id, ParentKey::Field("test"));
        self.set_parent(consequent, id, ParentKey::Field("consequent"));
        if let Some(a) = alternate {
            self.set_parent(a, id, ParentKey::Field("alternate"));
        }
        id
    }

    fn lower_for(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let init = ts.child_by_field_name("initializer").and_then(first_named).map(|n| self.lower_expr(n));
        let test = ts.child_by_field_name("condition").and_then(first_named).map(|n| self.lower_expr(n));
        let update = ts.child_by_field_name("increment").map(|n| self.lower_expr(n));
        let Some(body_ts) = ts.child_by_field_name("body") else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let body = self.lower_stmt(body_ts);
        let id = self.alloc(NodeKind::ForStatement { init, test, update, body }, range, src);
        if let Some(n) = init {
            self.set_parent(n, id, ParentKey::Field("init"));
        }
        if let Some(n) = test {
            self.set_parent(n, id, ParentKey::Field("test"));
        }
        if let Some(n) = update {
            self.set_parent(n, id, ParentKey::Field("update"));
        }
        self.set_parent(body, id, ParentKey::Field("body"));
        id
    }

    fn lower_for_in(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let (Some(left_ts), Some(right_ts), Some(body_ts)) = (
            ts.child_by_field_name("left"),
            ts.child_by_field_name("right"),
            ts.child_by_field_name("body"),
        ) else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let left = self.lower_expr(left_ts);
        let right = self.lower_expr(right_ts);
        let body = self.lower_stmt(body_ts);
        let is_of = src.contains(" of ");
        let id = if is_of {
            self.alloc(NodeKind::ForOfStatement { left, right, body }, range, src)
        } else {
            self.alloc(NodeKind::ForInStatement { left, right, body }, range, src)
        };
        self.set_parent(left, id, ParentKey::Field("left"));
        self.set_parent(right, id, ParentKey::Field("right"));
        self.set_parent(body, id, ParentKey::Field("body"));
        id
    }

    fn lower_while(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let (Some(cond_ts), Some(body_ts)) =
            (ts.child_by_field_name("condition").and_then(first_named), ts.child_by_field_name("body"))
        else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let test = self.lower_expr(cond_ts);
        let body = self.lower_stmt(body_ts);
        let id = self.alloc(NodeKind::WhileStatement { test, body }, range, src);
        self.set_parent(test, id, ParentKey::Field("test"));
        self.set_parent(body, id, ParentKey::Field("body"));
        id
    }

    fn lower_do_while(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let (Some(body_ts), Some(cond_ts)) =
            (ts.child_by_field_name("body"), ts.child_by_field_name("condition").and_then(first_named))
        else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let body = self.lower_stmt(body_ts);
        let test = self.lower_expr(cond_ts);
        let id = self.alloc(NodeKind::DoWhileStatement { test, body }, range, src);
        self.set_parent(test, id, ParentKey::Field("test"));
        self.set_parent(body, id, ParentKey::Field("body"));
        id
    }

    fn lower_switch(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let (Some(disc_ts), Some(body_ts)) = (
            ts.child_by_field_name("value").and_then(first_named),
            ts.child_by_field_name("body"),
        ) else {
            return self.alloc(NodeKind::Unknown { ts_kind: ts.kind().to_string() }, range, src);
        };
        let discriminant = self.lower_expr(disc_ts);
        let mut cursor = body_ts.walk();
        let mut cases = Vec::new();
        for case_ts in body_ts.named_children(&mut cursor) {
            if case_ts.kind() != "switch_case" && case_ts.kind() != "switch_default" {
                continue;
            }
            let test = if case_ts.kind() == "switch_case" {
                case_ts.child_by_field_name("value").map(|v| self.lower_expr(v))
            } else {
                None
            };
            let mut body_cursor = case_ts.walk();
            let consequent: Vec<NodeId> = case_ts
                .named_children(&mut body_cursor)
                .filter(|c| c.kind() != "value" && is_statement_kind(c.kind()))
                .map(|c| self.lower_stmt(c))
                .collect();
            let c_range = self.range(case_ts);
            let c_src = self.text(case_ts);
            let case_id = self.alloc(NodeKind::SwitchCase { test, consequent: consequent.clone() }, c_range, c_src);
            if let Some(t) = test {
                self.set_parent(t, case_id, ParentKey::Field("test"));
            }
            for (i, s) in consequent.into_iter().enumerate() {
                self.set_parent(s, case_id, ParentKey::Index("consequent", i));
            }
            cases.push(case_id);
        }
        let ids = cases.clone();
        let id = self.alloc(NodeKind::SwitchStatement { discriminant, cases }, range, src);
        self.set_parent(discriminant, id, ParentKey::Field("discriminant"));
        for (i, c) in ids.into_iter().enumerate() {
            self.set_parent(c, id, ParentKey::Index("cases", i));
        }
        id
    }

    fn lower_class(&mut self, ts: TsNode, range: Range, src: &'src str) -> NodeId {
        let name_id = ts.child_by_field_name("name").map(|n| {
            let r = self.range(n);
            let t = self.text(n);
            self.alloc(NodeKind::Identifier { name: t.to_string() }, r, t)
        });
        let mut body = Vec::new();
        if let Some(body_ts) = ts.child_by_field_name("body") {
            let mut cursor = body_ts.walk();
            for member in body_ts.named_children(&mut cursor) {
                if member.kind() == "method_definition" {
                    if let Some(m) = self.lower_method(member) {
                        body.push(m);
                    }
                }
            }
        }
        let ids = body.clone();
        let id = self.alloc(NodeKind::ClassDeclaration { id: name_id, body }, range, src);
        if let Some(n) = name_id {
            self.set_parent(n, id, ParentKey::Field("id"));
        }
        for (i, m) in ids.into_iter().enumerate() {
            self.set_parent(m, id, ParentKey::Index("body", i));
        }
        id
    }
}

fn is_statement_kind(kind: &str) -> bool {
    !matches!(kind, "value" | "case" | "default" | ":")
}

fn flatten_sequence(lowerer: &mut Lowerer, ts: TsNode, out: &mut Vec<NodeId>) {
    let left = ts.child_by_field_name("left");
    let right = ts.child_by_field_name("right");
    if let Some(l) = left {
        if l.kind() == "sequence_expression" {
            flatten_sequence(lowerer, l, out);
        } else {
            out.push(lowerer.lower_expr(l));
        }
    }
    if let Some(r) = right {
        if r.kind() == "sequence_expression" {
            flatten_sequence(lowerer, r, out);
        } else {
            out.push(lowerer.lower_expr(r));
        }
    }
}

fn first_named(ts: TsNode) -> Option<TsNode> {
    let mut cursor = ts.walk();
    ts.named_children(&mut cursor).next()
}

/// tree-sitter exposes the operator token as an unnamed child; there's
/// no stable field for it across grammar versions, so it's located by
/// scanning children for the first token that isn't a named (operand)
/// node.
fn operator_text<'a>(ts: TsNode, src: &'a str) -> Option<String> {
    let mut cursor = ts.walk();
    for child in ts.children(&mut cursor) {
        if !child.is_named() {
            let text = &src[child.start_byte() - ts.start_byte()..child.end_byte() - ts.start_byte()];
            if !text.is_empty() && text != "(" && text != ")" {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn method_kind(src: &str) -> MethodKind {
    let trimmed = src.trim_start();
    if trimmed.starts_with("get ") {
        MethodKind::Get
    } else if trimmed.starts_with("set ") {
        MethodKind::Set
    } else if trimmed.starts_with("constructor") {
        MethodKind::Constructor
    } else {
        MethodKind::Method
    }
}

fn unquote(src: &str) -> String {
    if src.len() < 2 {
        return String::new();
    }
    let inner = &src[1..src.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn split_regex(src: &str) -> (String, String) {
    if let Some(last_slash) = src.rfind('/') {
        if last_slash > 0 {
            return (src[1..last_slash].to_string(), src[last_slash + 1..].to_string());
        }
    }
    (src.to_string(), String::new())
}

/// Parses `source` with the given tree-sitter grammar and lowers the
/// result into a fully annotated [`Ast`] (parse + lower + initial
/// index, §3 "Lifecycle": "AST is created once per source load").
pub fn lower_source(source: &str, tree: &tree_sitter::Tree) -> Result<Ast> {
    let root_ts = tree.root_node();
    if root_ts.has_error() && root_ts.child_count() == 0 {
        return Err(RestringerError::Parse {
            message: "empty or unparseable source".to_string(),
        });
    }
    let mut lowerer = Lowerer { source, nodes: Vec::new() };
    let mut cursor = root_ts.walk();
    let body: Vec<NodeId> = root_ts.named_children(&mut cursor).map(|c| lowerer.lower_stmt(c)).collect();
    let range = lowerer.range(root_ts);
    let src = lowerer.text(root_ts);
    let root_id = lowerer.alloc(NodeKind::Program { body: body.clone() }, range, src);
    for (i, s) in body.into_iter().enumerate() {
        lowerer.set_parent(s, root_id, ParentKey::Index("body", i));
    }

    let mut ast = Ast::from_parts(source.to_string(), lowerer.nodes, root_id, ScopeTree::new());
    ast.reindex();
    Ok(ast)
}
