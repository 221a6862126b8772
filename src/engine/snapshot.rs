use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::engine::{
    ast::{Expr, ExprKind, Literal, Program, Stmt, StmtKind},
    value::{format_number, ErrorValue},
    LiteralFormat, SnapshotTarget,
};

const MAGIC: [u8; 4] = *b"JQSB";
const FORMAT_VERSION: u32 = 1;

/// Payload of a snapshot blob: the parsed program and the semantics it was
/// serialized for.
#[derive(Serialize, Deserialize)]
pub(crate) struct SnapshotBody {
    pub target: SnapshotTarget,
    pub program: Program,
}

pub(crate) fn encode(body: &SnapshotBody) -> Result<Vec<u8>, ErrorValue> {
    let payload =
        bincode::serialize(body).map_err(|err| ErrorValue::plain(format!("snapshot encoding failed: {err}")))?;
    let mut blob = Vec::with_capacity(8 + payload.len());
    blob.extend_from_slice(&MAGIC);
    blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    blob.extend_from_slice(&payload);
    Ok(blob)
}

pub(crate) fn decode(blob: &[u8]) -> Result<SnapshotBody, ErrorValue> {
    if blob.len() < 8 || blob[..4] != MAGIC {
        return Err(ErrorValue::plain("not a snapshot blob"));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&blob[4..8]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(ErrorValue::plain(format!(
            "unsupported snapshot format version {version}"
        )));
    }
    bincode::deserialize(&blob[8..])
        .map_err(|err| ErrorValue::plain(format!("snapshot decoding failed: {err}")))
}

/// String and number literals of a program in first-appearance order,
/// deduplicated.
pub(crate) fn literal_table(program: &Program) -> Vec<String> {
    let mut literals = IndexSet::new();
    for stmt in &program.body {
        collect_stmt(stmt, &mut literals);
    }
    literals.into_iter().collect()
}

pub(crate) fn render_literals(literals: &[String], format: LiteralFormat) -> Vec<u8> {
    let mut out = String::new();
    match format {
        LiteralFormat::List => {
            for literal in literals {
                out.push_str(literal);
                out.push('\n');
            }
        }
        LiteralFormat::CSource => {
            out.push_str(&format!(
                "const char *literals[{}] =\n{{\n",
                literals.len()
            ));
            for literal in literals {
                out.push_str("  \"");
                for ch in literal.chars() {
                    match ch {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        _ => out.push(ch),
                    }
                }
                out.push_str("\",\n");
            }
            out.push_str("};\n");
        }
    }
    out.into_bytes()
}

fn collect_stmt(stmt: &Stmt, literals: &mut IndexSet<String>) {
    match &stmt.kind {
        StmtKind::Decl { initializer, .. } => {
            if let Some(expr) = initializer {
                collect_expr(expr, literals);
            }
        }
        StmtKind::Function { body, .. } => {
            for stmt in body {
                collect_stmt(stmt, literals);
            }
        }
        StmtKind::Expr(expr) => collect_expr(expr, literals),
        StmtKind::Block(body) => {
            for stmt in body {
                collect_stmt(stmt, literals);
            }
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            collect_expr(condition, literals);
            collect_stmt(then_branch, literals);
            if let Some(branch) = else_branch {
                collect_stmt(branch, literals);
            }
        }
        StmtKind::While { condition, body } => {
            collect_expr(condition, literals);
            collect_stmt(body, literals);
        }
        StmtKind::For {
            init,
            condition,
            update,
            body,
        } => {
            if let Some(init) = init {
                collect_stmt(init, literals);
            }
            if let Some(condition) = condition {
                collect_expr(condition, literals);
            }
            if let Some(update) = update {
                collect_expr(update, literals);
            }
            collect_stmt(body, literals);
        }
        StmtKind::Return(expr) => {
            if let Some(expr) = expr {
                collect_expr(expr, literals);
            }
        }
        StmtKind::Break | StmtKind::Continue => {}
    }
}

fn collect_expr(expr: &Expr, literals: &mut IndexSet<String>) {
    match &expr.kind {
        ExprKind::Literal(Literal::String(s)) => {
            literals.insert(s.clone());
        }
        ExprKind::Literal(Literal::Number(n)) => {
            literals.insert(format_number(*n));
        }
        ExprKind::Literal(_) | ExprKind::Identifier(_) => {}
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            collect_expr(left, literals);
            collect_expr(right, literals);
        }
        ExprKind::Unary { expr, .. } | ExprKind::Group(expr) => collect_expr(expr, literals),
        ExprKind::Conditional {
            condition,
            consequent,
            alternate,
        } => {
            collect_expr(condition, literals);
            collect_expr(consequent, literals);
            collect_expr(alternate, literals);
        }
        ExprKind::Assign { target, value } => {
            collect_expr(target, literals);
            collect_expr(value, literals);
        }
        ExprKind::Call { callee, args } => {
            collect_expr(callee, literals);
            for arg in args {
                collect_expr(arg, literals);
            }
        }
        ExprKind::Member { object, .. } => collect_expr(object, literals),
        ExprKind::Index { object, index } => {
            collect_expr(object, literals);
            collect_expr(index, literals);
        }
        ExprKind::Array(elements) => {
            for element in elements {
                collect_expr(element, literals);
            }
        }
        ExprKind::Object(entries) => {
            for (_, value) in entries {
                collect_expr(value, literals);
            }
        }
        ExprKind::Function { body, .. } => {
            for stmt in body {
                collect_stmt(stmt, literals);
            }
        }
    }
}
