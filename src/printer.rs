//! Canonical source rendering of syntax trees.
//!
//! The printed form parses back to an equivalent tree: user parentheses
//! survive as grouping nodes, `while` prints from the bare loop node, and
//! the block-wrapped loop node prints as `for` syntax.

use crate::ast::{Expr, Literal, Stmt};

/// Render a program one declaration per line.
pub fn print_program(program: &[Stmt]) -> String {
    program
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expr(e) => format!("{};", print_expr(e)),
        Stmt::Print(e) => format!("print {};", print_expr(e)),
        Stmt::VarDecl(name, None) => format!("var {};", name.name),
        Stmt::VarDecl(name, Some(init)) => format!("var {} = {};", name.name, print_expr(init)),
        Stmt::FunDecl(name, params, body) => {
            let params = params
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("fun {}({}) {}", name.name, params, print_stmt(body))
        }
        Stmt::Block(stmts) => match &stmts[..] {
            // A block holding a single loop node is `for` syntax.
            [for_stmt @ Stmt::For { .. }] => print_for(for_stmt),
            [] => "{ }".to_string(),
            _ => format!(
                "{{ {} }}",
                stmts.iter().map(print_stmt).collect::<Vec<_>>().join(" ")
            ),
        },
        Stmt::If(cond, then_branch, else_branch) => {
            let mut s = format!("if ({}) {}", print_expr(cond), print_stmt(then_branch));
            if let Some(else_branch) = else_branch {
                s.push_str(" else ");
                s.push_str(&print_stmt(else_branch));
            }
            s
        }
        // A bare loop node is `while` syntax.
        Stmt::For { cond, body, .. } => {
            let cond = cond
                .as_deref()
                .map_or_else(|| "true".to_string(), print_expr);
            format!("while ({}) {}", cond, print_stmt(body))
        }
        Stmt::Break => "break;".to_string(),
        Stmt::Continue => "continue;".to_string(),
        Stmt::Return(None) => "return;".to_string(),
        Stmt::Return(Some(e)) => format!("return {};", print_expr(e)),
    }
}

fn print_for(stmt: &Stmt) -> String {
    let Stmt::For {
        init,
        cond,
        incr,
        body,
    } = stmt
    else {
        unreachable!("print_for expects a loop node");
    };
    let mut s = String::from("for (");
    match init {
        Some(init) => s.push_str(&print_stmt(init)),
        None => s.push(';'),
    }
    if let Some(cond) = cond {
        s.push(' ');
        s.push_str(&print_expr(cond));
    }
    s.push(';');
    if let Some(incr) = incr {
        s.push(' ');
        s.push_str(&print_expr(incr));
    }
    s.push_str(") ");
    s.push_str(&print_stmt(body));
    s
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(Literal::Nil) => "nil".to_string(),
        Expr::Literal(Literal::Bool(b)) => b.to_string(),
        Expr::Literal(Literal::Number(n)) => n.to_string(),
        Expr::Literal(Literal::Str(s)) => format!("\"{}\"", s),
        Expr::Grouping(inner) => format!("({})", print_expr(inner)),
        Expr::Unary(op, operand) => format!("{}{}", op.kind, print_expr(operand)),
        Expr::Binary(l, op, r) => format!("{} {} {}", print_expr(l), op.kind, print_expr(r)),
        Expr::LogicOr(l, r) => format!("{} or {}", print_expr(l), print_expr(r)),
        Expr::LogicAnd(l, r) => format!("{} and {}", print_expr(l), print_expr(r)),
        Expr::Identifier(name) => name.name.clone(),
        Expr::Assignment(name, rhs) => format!("{} = {}", name.name, print_expr(rhs)),
        Expr::Call(_, callee, args) => {
            let args = args.iter().map(print_expr).collect::<Vec<_>>().join(", ");
            format!("{}({})", print_expr(callee), args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn canon(src: &str) -> String {
        let out = Parser::new("test", src).parse_program();
        assert!(
            out.diagnostics.is_empty(),
            "parse failed: {:?}",
            out.diagnostics
        );
        print_program(&out.program)
    }

    #[test]
    fn statements_print_canonically() {
        assert_eq!(canon("print 1+2*3;"), "print 1 + 2 * 3;");
        assert_eq!(canon("var x=1;"), "var x = 1;");
        assert_eq!(canon("{ 1; 2; }"), "{ 1; 2; }");
        assert_eq!(canon("while(a)b;"), "while (a) b;");
        assert_eq!(canon("for(;;)break;"), "for (;;) break;");
        assert_eq!(canon("fun f(a,b){return a;}"), "fun f(a, b) { return a; }");
    }

    #[test]
    fn if_else_prints_both_branches() {
        assert_eq!(canon("if(a)b;else c;"), "if (a) b; else c;");
        assert_eq!(canon("if(a){b;}"), "if (a) { b; }");
    }

    #[test]
    fn groupings_are_preserved() {
        assert_eq!(canon("(1+2)*3;"), "(1 + 2) * 3;");
    }

    #[test]
    fn numbers_print_in_shortest_form() {
        assert_eq!(canon("print 1.0;"), "print 1;");
        assert_eq!(canon("print 2.50;"), "print 2.5;");
    }

    #[test]
    fn printed_programs_reparse_to_the_same_form() {
        let sources = [
            "print \"Hello, world!\";",
            "var x = 1; { var x = 2; print x; } print x;",
            "fun f(n) { if (n < 2) return n; return f(n - 1) + f(n - 2); } print f(10);",
            "for (var i = 0; i < 3; i = i + 1) { if (i == 1) continue; print i; }",
            "while (true) { break; }",
            "var s = \"a\"; s = s + \"b\"; print s;",
            "print -x == !y or a and b;",
            "f(g(1), 2);",
        ];
        for src in sources {
            let printed = canon(src);
            assert_eq!(canon(&printed), printed, "not a fixpoint for {src}");
        }
    }
}
