//! Rendering expressions as LaTeX.

use crate::algebra::{
    expr::Precedence, AppliedFunction, Expression, Symbol, SymbolKind,
};

impl Expression {
    /// Render this expression as LaTeX, suitable for MathJax or KaTeX.
    pub fn to_latex(&self) -> String {
        match self {
            Expression::Constant(value) => value.to_latex(),
            Expression::Symbol(symbol) => symbol.to_latex(),
            Expression::Function(applied) => applied.to_latex(),
            Expression::Sum(terms) => latex_sum(terms),
            Expression::Product(factors) => latex_product(factors),
            Expression::Power { base, exponent } => format!(
                "{{{}}}^{{{}}}",
                operand(base, base.precedence() < Precedence::Atom),
                exponent
            ),
            Expression::Negate(inner) => format!(
                "-{}",
                operand(
                    inner,
                    inner.precedence() < Precedence::Product
                        || inner.starts_with_minus()
                )
            ),
            Expression::Quotient {
                numerator,
                denominator,
            } => format!(
                "\\frac{{{}}}{{{}}}",
                numerator.to_latex(),
                denominator.to_latex()
            ),
            Expression::Sqrt(inner) => format!("\\sqrt{{{}}}", inner.to_latex()),
            Expression::Derivative { operand: inner, variables } => {
                let order = variables.len();
                let denominator = latex_differentials(variables);

                if inner.precedence() == Precedence::Atom {
                    format!(
                        "\\frac{{{} {}}}{{{}}}",
                        partial(order),
                        inner.to_latex(),
                        denominator
                    )
                } else {
                    format!(
                        "\\frac{{{}}}{{{}}} {}",
                        partial(order),
                        denominator,
                        operand(inner, true)
                    )
                }
            },
        }
    }
}

impl Symbol {
    pub fn to_latex(&self) -> String {
        match self.kind() {
            SymbolKind::Operator => format!(
                "\\partial_{{{}}}",
                self.name().trim_start_matches('∂')
            ),
            _ => self.name().to_string(),
        }
    }
}

impl AppliedFunction {
    pub fn to_latex(&self) -> String {
        let [first, second] = self.arguments();
        let call = format!(
            "{}\\left({}, {}\\right)",
            self.function(),
            first.to_latex(),
            second.to_latex()
        );

        let order = self.derivative_count();
        if order == 0 {
            return call;
        }

        format!(
            "\\frac{{{} {}}}{{{}}}",
            partial(order as usize),
            call,
            latex_differentials(&self.derivative_variables())
        )
    }
}

fn partial(order: usize) -> String {
    if order == 1 {
        String::from("\\partial")
    } else {
        format!("\\partial^{{{}}}", order)
    }
}

/// Something like `\partial x^{2} \partial p`.
fn latex_differentials(variables: &[Symbol]) -> String {
    let mut groups: Vec<(&Symbol, usize)> = Vec::new();

    for variable in variables {
        if let Some((last, count)) = groups.last_mut() {
            if *last == variable {
                *count += 1;
                continue;
            }
        }

        groups.push((variable, 1));
    }

    groups
        .into_iter()
        .map(|(variable, count)| {
            if count == 1 {
                format!("\\partial {}", variable.to_latex())
            } else {
                format!("\\partial {}^{{{}}}", variable.to_latex(), count)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn latex_sum(terms: &[Expression]) -> String {
    let mut buffer = String::new();

    for (i, term) in terms.iter().enumerate() {
        let rendered = operand(term, term.precedence() == Precedence::Sum);

        if i == 0 {
            buffer.push_str(&rendered);
        } else if let Some(rest) = rendered.strip_prefix('-') {
            buffer.push_str(" - ");
            buffer.push_str(rest);
        } else {
            buffer.push_str(" + ");
            buffer.push_str(&rendered);
        }
    }

    buffer
}

fn latex_product(factors: &[Expression]) -> String {
    factors
        .iter()
        .enumerate()
        .map(|(i, factor)| {
            let parens = factor.precedence() < Precedence::Product
                || (i > 0 && factor.starts_with_minus());
            operand(factor, parens)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn operand(expr: &Expression, parens: bool) -> String {
    if parens {
        format!("\\left({}\\right)", expr.to_latex())
    } else {
        expr.to_latex()
    }
}

#[cfg(test)]
mod tests {
    use crate::{parse, Symbols};

    #[test]
    fn render_as_latex() {
        let inputs = vec![
            ("x + 1", "x + 1"),
            ("x - 1/2*p", "x - \\frac{1}{2} p"),
            ("(x + p)^2", "{\\left(x + p\\right)}^{2}"),
            ("i/2*x", "\\frac{i}{2} x"),
            ("sqrt(2)*x", "\\sqrt{2} x"),
            ("W(x, p)", "W\\left(x, p\\right)"),
            (
                "Derivative(W(x, p), x)",
                "\\frac{\\partial W\\left(x, p\\right)}{\\partial x}",
            ),
            (
                "Derivative(W(x, p), x, x, p)",
                "\\frac{\\partial^{3} W\\left(x, p\\right)}{\\partial x^{2} \\partial p}",
            ),
        ];
        let symbols = Symbols::new();

        for (src, should_be) in inputs {
            let expr = parse(src, &symbols).unwrap();

            let got = expr.to_latex();

            assert_eq!(got, should_be, "{}", src);
        }
    }

    #[test]
    fn evaluated_derivatives_use_the_same_notation() {
        let symbols = Symbols::new();
        let expr = parse("Derivative(W(x, p), p, p)", &symbols).unwrap();
        let evaluated = crate::algebra::ops::simplify(&expr).unwrap();

        assert_eq!(evaluated.to_latex(), expr.to_latex());
    }

    #[test]
    fn operators_render_as_partial_derivatives() {
        let symbols = Symbols::new();

        assert_eq!(symbols.dx().to_latex(), "\\partial_{x'}");
        assert_eq!(symbols.p_primed().to_latex(), "p'");
    }
}
