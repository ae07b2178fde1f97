use moss_ty::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Severity {
  Info,
  Warning,
  Error,
  Hint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
  pub span: Span,
  pub message: String,
}

/// One rendered finding. The engine never prints these itself; hosts own the
/// source text and turn spans into file/line/column presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
  pub severity: Severity,
  pub message: String,
  pub error_code: String,
  pub primary_span: Span,
  pub labels: Vec<Label>,
}

impl Diagnostic {
  pub fn new(
    severity: Severity,
    message: String,
    error_code: String,
    primary_span: Span,
  ) -> Self {
    Self {
      severity,
      message,
      error_code,
      primary_span,
      labels: Vec::new(),
    }
  }

  pub fn with_label(
    mut self,
    span: Span,
    message: String,
  ) -> Self {
    self.labels.push(Label { span, message });
    self
  }
}
