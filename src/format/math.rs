//! Math rendering boundary.
//!
//! The formatter only locates LaTeX spans. Turning them into displayable
//! output is delegated to a [`MathRenderer`]; any failure degrades to the raw
//! source so a half-streamed or exotic expression never breaks a message.

use thiserror::Error;
use tracing::debug;

/// Errors from a math renderer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("unsupported command: \\{0}")]
    UnknownCommand(String),

    #[error("unbalanced braces")]
    UnbalancedBraces,

    #[error("missing argument for {0}")]
    MissingArgument(String),
}

/// Converts LaTeX source into display markup.
pub trait MathRenderer: Send + Sync {
    fn render(&self, tex: &str, display: bool) -> Result<String, MathError>;
}

/// Result of rendering one math span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathOutput {
    Rendered(String),
    /// The renderer failed; holds the raw TeX.
    Fallback(String),
}

impl MathOutput {
    pub fn text(&self) -> &str {
        match self {
            MathOutput::Rendered(s) | MathOutput::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, MathOutput::Fallback(_))
    }
}

/// Render a span, falling back to the literal source on error.
pub fn render_math(renderer: &dyn MathRenderer, tex: &str, display: bool) -> MathOutput {
    match renderer.render(tex, display) {
        Ok(markup) => MathOutput::Rendered(markup),
        Err(e) => {
            let is_display = display;
            debug!(error = %e, tex, display = is_display, "Math render failed, showing source");
            MathOutput::Fallback(tex.to_string())
        }
    }
}

/// Renders a LaTeX subset as plain Unicode for terminal output.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeMathRenderer;

impl MathRenderer for UnicodeMathRenderer {
    fn render(&self, tex: &str, _display: bool) -> Result<String, MathError> {
        let mut parser = TexParser { src: tex, pos: 0 };
        let out = parser.parse_until(None)?;
        Ok(collapse_spaces(out.trim()))
    }
}

struct TexParser<'a> {
    src: &'a str,
    pos: usize,
}

impl TexParser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Parse until `close` (consumed) or end of input when `close` is `None`.
    fn parse_until(&mut self, close: Option<char>) -> Result<String, MathError> {
        let mut out = String::new();

        loop {
            let Some(c) = self.bump() else {
                return match close {
                    Some(_) => Err(MathError::UnbalancedBraces),
                    None => Ok(out),
                };
            };

            match c {
                c if Some(c) == close => return Ok(out),
                '}' => return Err(MathError::UnbalancedBraces),
                '{' => out.push_str(&self.parse_until(Some('}'))?),
                '^' => {
                    let arg = self.argument("^")?;
                    out.push_str(&script(&arg, superscript, '^'));
                }
                '_' => {
                    let arg = self.argument("_")?;
                    out.push_str(&script(&arg, subscript, '_'));
                }
                '\\' => out.push_str(&self.command()?),
                '&' | '~' => out.push(' '),
                c => out.push(c),
            }
        }
    }

    /// A single argument: a braced group, a command, or one character.
    fn argument(&mut self, owner: &str) -> Result<String, MathError> {
        self.skip_spaces();
        match self.bump() {
            Some('{') => self.parse_until(Some('}')),
            Some('\\') => self.command(),
            Some('}') | None => Err(MathError::MissingArgument(owner.to_string())),
            Some(c) => Ok(c.to_string()),
        }
    }

    fn optional_bracket(&mut self) -> Result<Option<String>, MathError> {
        self.skip_spaces();
        if self.peek() != Some('[') {
            return Ok(None);
        }
        self.bump();
        self.parse_until(Some(']')).map(Some)
    }

    fn command(&mut self) -> Result<String, MathError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
        let name = &self.src[start..self.pos];

        if name.is_empty() {
            return Ok(match self.bump() {
                Some(',' | ';' | ':' | ' ') => " ".to_string(),
                Some('!') => String::new(),
                Some('\\') => " ".to_string(),
                Some(c) => c.to_string(),
                None => return Err(MathError::MissingArgument("\\".to_string())),
            });
        }

        if let Some(symbol) = symbol(name) {
            return Ok(symbol.to_string());
        }

        match name {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.argument(name)?;
                let den = self.argument(name)?;
                Ok(format!("{}/{}", wrap(&num), wrap(&den)))
            }
            "sqrt" => {
                let index = self.optional_bracket()?;
                let radicand = self.argument(name)?;
                let root = match index {
                    Some(n) => format!("{}√", script(&n, superscript, '^')),
                    None => "√".to_string(),
                };
                Ok(format!("{root}{}", wrap(&radicand)))
            }
            "text" | "textrm" | "textit" | "textbf" | "mathrm" | "mathit" | "mathbf"
            | "operatorname" | "mbox" => self.argument(name),
            "mathbb" => {
                let arg = self.argument(name)?;
                Ok(arg.chars().map(double_struck).collect())
            }
            "left" | "right" | "big" | "Big" | "bigl" | "bigr" => {
                self.skip_spaces();
                match self.bump() {
                    Some('.') => Ok(String::new()),
                    Some('\\') => self.command(),
                    Some(c) => Ok(c.to_string()),
                    None => Err(MathError::MissingArgument(name.to_string())),
                }
            }
            "quad" => Ok("  ".to_string()),
            "qquad" => Ok("    ".to_string()),
            "sin" | "cos" | "tan" | "log" | "ln" | "exp" | "lim" | "max" | "min" | "det"
            | "arg" | "deg" | "gcd" | "sup" | "inf" => Ok(name.to_string()),
            _ => Err(MathError::UnknownCommand(name.to_string())),
        }
    }
}

/// Parenthesize multi-symbol operands of `/`.
fn wrap(operand: &str) -> String {
    let trimmed = operand.trim();
    if trimmed.chars().count() <= 1 || trimmed.chars().all(|c| c.is_alphanumeric()) {
        trimmed.to_string()
    } else {
        format!("({trimmed})")
    }
}

fn script(arg: &str, map: fn(char) -> Option<char>, marker: char) -> String {
    let mapped: Option<String> = arg.chars().map(map).collect();
    match mapped {
        Some(s) => s,
        None if arg.chars().count() == 1 => format!("{marker}{arg}"),
        None => format!("{marker}({arg})"),
    }
}

fn superscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' | '−' => '⁻',
        '=' => '⁼',
        '(' => '⁽',
        ')' => '⁾',
        'a' => 'ᵃ',
        'b' => 'ᵇ',
        'c' => 'ᶜ',
        'd' => 'ᵈ',
        'e' => 'ᵉ',
        'f' => 'ᶠ',
        'g' => 'ᵍ',
        'h' => 'ʰ',
        'i' => 'ⁱ',
        'j' => 'ʲ',
        'k' => 'ᵏ',
        'l' => 'ˡ',
        'm' => 'ᵐ',
        'n' => 'ⁿ',
        'o' => 'ᵒ',
        'p' => 'ᵖ',
        'r' => 'ʳ',
        's' => 'ˢ',
        't' => 'ᵗ',
        'u' => 'ᵘ',
        'v' => 'ᵛ',
        'w' => 'ʷ',
        'x' => 'ˣ',
        'y' => 'ʸ',
        'z' => 'ᶻ',
        'T' => 'ᵀ',
        '′' => '′',
        _ => return None,
    })
}

fn subscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        '+' => '₊',
        '-' | '−' => '₋',
        '=' => '₌',
        '(' => '₍',
        ')' => '₎',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'h' => 'ₕ',
        'i' => 'ᵢ',
        'j' => 'ⱼ',
        'k' => 'ₖ',
        'l' => 'ₗ',
        'm' => 'ₘ',
        'n' => 'ₙ',
        'o' => 'ₒ',
        'p' => 'ₚ',
        'r' => 'ᵣ',
        's' => 'ₛ',
        't' => 'ₜ',
        'u' => 'ᵤ',
        'v' => 'ᵥ',
        'x' => 'ₓ',
        _ => return None,
    })
}

fn double_struck(c: char) -> char {
    match c {
        'C' => 'ℂ',
        'H' => 'ℍ',
        'N' => 'ℕ',
        'P' => 'ℙ',
        'Q' => 'ℚ',
        'R' => 'ℝ',
        'Z' => 'ℤ',
        other => other,
    }
}

fn symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        // Greek
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" | "varepsilon" => "ε",
        "zeta" => "ζ",
        "eta" => "η",
        "theta" | "vartheta" => "θ",
        "iota" => "ι",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "xi" => "ξ",
        "pi" => "π",
        "rho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "upsilon" => "υ",
        "phi" | "varphi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Xi" => "Ξ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        // Operators
        "cdot" => "·",
        "times" => "×",
        "div" => "÷",
        "pm" => "±",
        "mp" => "∓",
        "ast" => "∗",
        "circ" => "∘",
        "sum" => "∑",
        "prod" => "∏",
        "int" => "∫",
        "oint" => "∮",
        "partial" => "∂",
        "nabla" => "∇",
        "infty" => "∞",
        "cup" => "∪",
        "cap" => "∩",
        "wedge" | "land" => "∧",
        "vee" | "lor" => "∨",
        "neg" | "lnot" => "¬",
        "forall" => "∀",
        "exists" => "∃",
        "emptyset" | "varnothing" => "∅",
        "ldots" | "dots" | "cdots" => "…",
        "prime" => "′",
        // Relations
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "equiv" => "≡",
        "sim" => "∼",
        "propto" => "∝",
        "in" => "∈",
        "notin" => "∉",
        "subset" => "⊂",
        "subseteq" => "⊆",
        "supset" => "⊃",
        "supseteq" => "⊇",
        "to" | "rightarrow" => "→",
        "leftarrow" | "gets" => "←",
        "Rightarrow" | "implies" => "⇒",
        "Leftarrow" => "⇐",
        "leftrightarrow" => "↔",
        "Leftrightarrow" | "iff" => "⇔",
        "mapsto" => "↦",
        // Delimiters
        "langle" => "⟨",
        "rangle" => "⟩",
        "lvert" | "rvert" | "vert" => "|",
        "lVert" | "rVert" | "Vert" => "‖",
        "lfloor" => "⌊",
        "rfloor" => "⌋",
        "lceil" => "⌈",
        "rceil" => "⌉",
        _ => return None,
    })
}

fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = false;
    for c in s.chars() {
        if c == ' ' {
            if !last_space {
                out.push(c);
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out
}
