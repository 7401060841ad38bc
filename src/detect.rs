//! Obfuscator-family detection (§4.K).
//!
//! A cheap shape/literal scan over the parsed source, run once before
//! the main loop, that picks at most one `ProcessorBundle` to run as a
//! preprocessor/postprocessor pair. Detection never mutates anything —
//! it only decides which bundle (if any) the orchestrator should
//! reach for.

use crate::ast::{Ast, LiteralValue, NodeKind};
use crate::processors::{self, Bundle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    ObfuscatorIo,
    AugmentedArray,
    FunctionToArray,
    CaesarPlus,
}

impl Family {
    fn bundle(self) -> Bundle {
        match self {
            Family::ObfuscatorIo => processors::obfuscator_io::bundle(),
            Family::AugmentedArray => processors::augmented_array::bundle(),
            Family::FunctionToArray => processors::function_to_array::bundle(),
            Family::CaesarPlus => processors::caesar_plus::bundle(),
        }
    }
}

/// Runs every family's shape check against `ast` and returns the first
/// match, in a fixed priority order: a marker-literal hit is the
/// strongest signal, so obfuscator.io is checked first; the remaining
/// three are checked by how specific their shape requirement is.
pub fn detect(ast: &Ast) -> Option<Bundle> {
    let family = if has_debug_trap_markers(ast) {
        Family::ObfuscatorIo
    } else if has_array_rotation_iife(ast) {
        Family::AugmentedArray
    } else if has_array_returning_function(ast) {
        Family::FunctionToArray
    } else if has_top_level_iife(ast) {
        Family::CaesarPlus
    } else {
        return None;
    };
    Some(family.bundle())
}

fn has_debug_trap_markers(ast: &Ast) -> bool {
    ast.of_kind("Literal").iter().any(|id| {
        matches!(
            ast.get(*id).as_literal(),
            Some(LiteralValue::Str(s)) if s == "newState" || s == "removeCookie"
        )
    })
}

fn has_array_rotation_iife(ast: &Ast) -> bool {
    ast.of_kind("CallExpression").iter().any(|id| {
        let NodeKind::CallExpression { callee, arguments } = &ast.get(*id).kind else { return false };
        if arguments.len() != 2 {
            return false;
        }
        let NodeKind::FunctionExpression { params, body, .. } = &ast.get(*callee).kind else { return false };
        if params.len() != 2 {
            return false;
        }
        let NodeKind::BlockStatement { body: stmts } = &ast.get(*body).kind else { return false };
        stmts.len() == 1 && matches!(&ast.get(stmts[0]).kind, NodeKind::WhileStatement { .. })
    })
}

fn has_array_returning_function(ast: &Ast) -> bool {
    let is_shell = |id: &crate::ast::NodeId| {
        let body = match &ast.get(*id).kind {
            NodeKind::FunctionDeclaration { body, .. } | NodeKind::FunctionExpression { body, .. } => *body,
            _ => return false,
        };
        let NodeKind::BlockStatement { body: stmts } = &ast.get(body).kind else { return false };
        if stmts.len() != 1 {
            return false;
        }
        let NodeKind::ReturnStatement { argument: Some(value) } = &ast.get(stmts[0]).kind else { return false };
        matches!(&ast.get(*value).kind, NodeKind::ArrayExpression { .. })
    };
    ast.of_kind("FunctionDeclaration").iter().any(is_shell) || ast.of_kind("FunctionExpression").iter().any(is_shell)
}

fn has_top_level_iife(ast: &Ast) -> bool {
    let NodeKind::Program { body } = &ast.get(ast.root).kind else { return false };
    body.len() == 1
        && matches!(&ast.get(body[0]).kind, NodeKind::ExpressionStatement { expression }
            if matches!(&ast.get(*expression).kind, NodeKind::CallExpression { callee, arguments }
                if arguments.is_empty() && matches!(&ast.get(*callee).kind, NodeKind::FunctionExpression { params, .. } if params.is_empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{SourceParser, TreeSitterFrontend};

    fn parse(src: &str) -> Ast {
        TreeSitterFrontend::new().unwrap().parse_source(src).unwrap()
    }

    #[test]
    fn detects_obfuscator_io_markers() {
        let ast = parse(r#"function f(){ if (x === "newState") { return; } }"#);
        assert_eq!(detect(&ast).map(|b| b.name), Some("obfuscator.io"));
    }

    #[test]
    fn detects_no_family_on_plain_code() {
        let ast = parse("var x = 1 + 2;");
        assert!(detect(&ast).is_none());
    }

    #[test]
    fn detects_caesar_plus_wrapper() {
        let ast = parse("(function(){ var a = 1; })();");
        assert_eq!(detect(&ast).map(|b| b.name), Some("caesar-plus"));
    }
}
