use moss_ty::decl::Visibility;
use moss_ty::span::Span;
use moss_ty::symbol::SymbolTable;
use moss_ty::ty::IntegerKind;
use moss_ty::BytePosition;

use crate::annot::{AnnotId, AnnotKind, TypeAnnot};
use crate::item::{
  ConstItem, EnumItem, FieldItem, FunctionItem, ModuleItem, ParamItem, SchemaItem, SpecBlockItem, StructItem,
  TypeParamItem, UseDecl, VariantItem,
};
use crate::operation::BinaryOp;
use crate::path::{Path, PathId};
use crate::pattern::{FieldPat, Pat, PatId, PatKind};
use crate::statement::{IncludeStmt, LetKind};
use crate::{Block, LambdaParam, Lit, MatchArm, Node, NodeId, NodeKind, StructLitField, Unit};

/// Assembles a `Unit` node by node. Spans are synthetic, two bytes per
/// allocation, so they are distinct and ordered by construction; hosts with
/// real source positions build the arenas directly instead.
#[derive(Default)]
pub struct UnitBuilder {
  pub unit: Unit,
  pub symbols: SymbolTable,
  cursor: u32,
}

impl UnitBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn finish(self) -> (Unit, SymbolTable) {
    (self.unit, self.symbols)
  }

  pub fn span(&mut self) -> Span {
    let start = self.cursor;
    self.cursor += 2;
    Span::new(BytePosition(start), BytePosition(start + 1))
  }

  fn node(
    &mut self,
    kind: NodeKind,
  ) -> NodeId {
    let span = self.span();
    self.unit.nodes.alloc(Node { kind, span })
  }

  fn pat(
    &mut self,
    kind: PatKind,
  ) -> PatId {
    let span = self.span();
    self.unit.pats.alloc(Pat { kind, span })
  }

  // --- Paths and annotations ---

  pub fn path(
    &mut self,
    segments: &[&str],
  ) -> PathId {
    self.path_with_args(segments, Vec::new())
  }

  pub fn path_with_args(
    &mut self,
    segments: &[&str],
    type_args: Vec<AnnotId>,
  ) -> PathId {
    let segments = segments.iter().map(|s| self.symbols.intern(s)).collect();
    let span = self.span();
    self.unit.paths.alloc(Path {
      segments,
      type_args,
      span,
    })
  }

  pub fn annot_path(
    &mut self,
    segments: &[&str],
  ) -> AnnotId {
    self.annot_generic(segments, Vec::new())
  }

  pub fn annot_generic(
    &mut self,
    segments: &[&str],
    type_args: Vec<AnnotId>,
  ) -> AnnotId {
    let path = self.path_with_args(segments, type_args);
    let span = self.unit.paths.get(&path).span;
    self.unit.annots.alloc(TypeAnnot {
      kind: AnnotKind::Path(path),
      span,
    })
  }

  /// Shorthand for a single-segment annotation: `u64`, `bool`, `T`.
  pub fn annot_name(
    &mut self,
    name: &str,
  ) -> AnnotId {
    self.annot_path(&[name])
  }

  pub fn annot_ref(
    &mut self,
    inner: AnnotId,
    mutable: bool,
  ) -> AnnotId {
    let span = self.span();
    self.unit.annots.alloc(TypeAnnot {
      kind: AnnotKind::Ref { inner, mutable },
      span,
    })
  }

  pub fn annot_tuple(
    &mut self,
    elements: Vec<AnnotId>,
  ) -> AnnotId {
    let span = self.span();
    self.unit.annots.alloc(TypeAnnot {
      kind: AnnotKind::Tuple(elements),
      span,
    })
  }

  pub fn annot_unit(&mut self) -> AnnotId {
    self.annot_tuple(Vec::new())
  }

  pub fn annot_lambda(
    &mut self,
    params: Vec<AnnotId>,
    ret: Option<AnnotId>,
  ) -> AnnotId {
    let span = self.span();
    self.unit.annots.alloc(TypeAnnot {
      kind: AnnotKind::Lambda { params, ret },
      span,
    })
  }

  // --- Literal expressions ---

  pub fn bool_lit(
    &mut self,
    value: bool,
  ) -> NodeId {
    self.node(NodeKind::Literal(Lit::Bool(value)))
  }

  /// Unsuffixed integer literal, the refinement-eligible kind.
  pub fn int_lit(
    &mut self,
    value: u128,
  ) -> NodeId {
    self.node(NodeKind::Literal(Lit::Int { value, kind: None }))
  }

  pub fn typed_int(
    &mut self,
    value: u128,
    kind: IntegerKind,
  ) -> NodeId {
    self.node(NodeKind::Literal(Lit::Int {
      value,
      kind: Some(kind),
    }))
  }

  pub fn address_lit(
    &mut self,
    text: &str,
  ) -> NodeId {
    let sym = self.symbols.intern(text);
    self.node(NodeKind::Literal(Lit::Address(sym)))
  }

  pub fn byte_string(
    &mut self,
    text: &str,
  ) -> NodeId {
    self.node(NodeKind::Literal(Lit::ByteString(text.to_string())))
  }

  pub fn hex_string(
    &mut self,
    text: &str,
  ) -> NodeId {
    self.node(NodeKind::Literal(Lit::HexString(text.to_string())))
  }

  // --- Expressions ---

  pub fn path_expr(
    &mut self,
    path: PathId,
  ) -> NodeId {
    self.node(NodeKind::Path(path))
  }

  /// Single-segment path expression, the plain name use.
  pub fn name(
    &mut self,
    name: &str,
  ) -> NodeId {
    let path = self.path(&[name]);
    self.path_expr(path)
  }

  pub fn binary(
    &mut self,
    op: BinaryOp,
    lhs: NodeId,
    rhs: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Binary { op, lhs, rhs })
  }

  pub fn not(
    &mut self,
    expr: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Not(expr))
  }

  pub fn borrow(
    &mut self,
    expr: NodeId,
    mutable: bool,
  ) -> NodeId {
    self.node(NodeKind::Borrow { expr, mutable })
  }

  pub fn deref(
    &mut self,
    expr: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Deref(expr))
  }

  pub fn cast(
    &mut self,
    expr: NodeId,
    annot: AnnotId,
  ) -> NodeId {
    self.node(NodeKind::Cast { expr, annot })
  }

  pub fn call(
    &mut self,
    path: PathId,
    args: Vec<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::Call { path, args })
  }

  pub fn method_call(
    &mut self,
    receiver: NodeId,
    method: &str,
    type_args: Vec<AnnotId>,
    args: Vec<NodeId>,
  ) -> NodeId {
    let method = self.symbols.intern(method);
    self.node(NodeKind::MethodCall {
      receiver,
      method,
      type_args,
      args,
    })
  }

  pub fn macro_call(
    &mut self,
    name: &str,
    args: Vec<NodeId>,
  ) -> NodeId {
    let name = self.symbols.intern(name);
    self.node(NodeKind::MacroCall { name, args })
  }

  pub fn field_access(
    &mut self,
    base: NodeId,
    field: &str,
  ) -> NodeId {
    let field = self.symbols.intern(field);
    self.node(NodeKind::FieldAccess { base, field })
  }

  pub fn index(
    &mut self,
    base: NodeId,
    index: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Index { base, index })
  }

  pub fn struct_lit(
    &mut self,
    path: PathId,
    fields: Vec<(&str, Option<NodeId>)>,
  ) -> NodeId {
    let fields = fields
      .into_iter()
      .map(|(name, value)| {
        let name = self.symbols.intern(name);
        let span = self.span();
        StructLitField { name, value, span }
      })
      .collect();
    self.node(NodeKind::StructLit { path, fields })
  }

  pub fn vector_lit(
    &mut self,
    type_arg: Option<AnnotId>,
    elements: Vec<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::VectorLit { type_arg, elements })
  }

  pub fn tuple(
    &mut self,
    elements: Vec<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::Tuple(elements))
  }

  pub fn unit_expr(&mut self) -> NodeId {
    self.tuple(Vec::new())
  }

  pub fn lambda(
    &mut self,
    params: Vec<LambdaParam>,
    body: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Lambda { params, body })
  }

  pub fn lambda_param(
    &mut self,
    name: &str,
    annot: Option<AnnotId>,
  ) -> LambdaParam {
    let pat = self.bind(name);
    LambdaParam { pat, annot }
  }

  pub fn range(
    &mut self,
    lo: NodeId,
    hi: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Range { lo, hi })
  }

  pub fn if_expr(
    &mut self,
    condition: NodeId,
    then_branch: NodeId,
    else_branch: Option<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::If {
      condition,
      then_branch,
      else_branch,
    })
  }

  pub fn while_expr(
    &mut self,
    condition: NodeId,
    body: NodeId,
  ) -> NodeId {
    self.node(NodeKind::While { condition, body })
  }

  pub fn loop_expr(
    &mut self,
    body: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Loop { body })
  }

  pub fn for_expr(
    &mut self,
    pat: PatId,
    iterable: NodeId,
    body: NodeId,
  ) -> NodeId {
    self.node(NodeKind::For { pat, iterable, body })
  }

  pub fn match_expr(
    &mut self,
    scrutinee: NodeId,
    arms: Vec<MatchArm>,
  ) -> NodeId {
    self.node(NodeKind::Match { scrutinee, arms })
  }

  pub fn arm(
    &mut self,
    pattern: PatId,
    guard: Option<NodeId>,
    body: NodeId,
  ) -> MatchArm {
    MatchArm { pattern, guard, body }
  }

  pub fn block(
    &mut self,
    statements: Vec<NodeId>,
    expression: Option<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::Block(Block { statements, expression }))
  }

  pub fn spec_block(
    &mut self,
    statements: Vec<NodeId>,
    expression: Option<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::SpecBlock(Block { statements, expression }))
  }

  pub fn is_expr(
    &mut self,
    expr: NodeId,
    variants: Vec<PathId>,
  ) -> NodeId {
    self.node(NodeKind::Is { expr, variants })
  }

  pub fn ret(
    &mut self,
    value: Option<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::Return(value))
  }

  pub fn abort(
    &mut self,
    code: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Abort(code))
  }

  pub fn brk(
    &mut self,
    value: Option<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::Break(value))
  }

  pub fn cont(&mut self) -> NodeId {
    self.node(NodeKind::Continue)
  }

  pub fn error(&mut self) -> NodeId {
    self.node(NodeKind::Error)
  }

  // --- Statements ---

  pub fn let_stmt(
    &mut self,
    pat: PatId,
    annot: Option<AnnotId>,
    init: Option<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::Let {
      pat,
      annot,
      init,
      kind: LetKind::Ordinary,
    })
  }

  pub fn spec_let(
    &mut self,
    kind: LetKind,
    pat: PatId,
    annot: Option<AnnotId>,
    init: Option<NodeId>,
  ) -> NodeId {
    self.node(NodeKind::Let { pat, annot, init, kind })
  }

  pub fn assign(
    &mut self,
    target: NodeId,
    value: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Assign { target, value })
  }

  pub fn include_plain(
    &mut self,
    schema: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Include(IncludeStmt::Plain { schema }))
  }

  pub fn include_if(
    &mut self,
    condition: NodeId,
    schema: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Include(IncludeStmt::If { condition, schema }))
  }

  pub fn include_if_else(
    &mut self,
    condition: NodeId,
    then_schema: NodeId,
    else_schema: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Include(IncludeStmt::IfElse {
      condition,
      then_schema,
      else_schema,
    }))
  }

  pub fn include_imply(
    &mut self,
    condition: NodeId,
    schema: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Include(IncludeStmt::Imply { condition, schema }))
  }

  pub fn update(
    &mut self,
    target: NodeId,
    value: NodeId,
  ) -> NodeId {
    self.node(NodeKind::Update { target, value })
  }

  // --- Patterns ---

  pub fn wild(&mut self) -> PatId {
    self.pat(PatKind::Wildcard)
  }

  pub fn bind(
    &mut self,
    name: &str,
  ) -> PatId {
    let name = self.symbols.intern(name);
    self.pat(PatKind::Binding { name, mutable: false })
  }

  pub fn bind_mut(
    &mut self,
    name: &str,
  ) -> PatId {
    let name = self.symbols.intern(name);
    self.pat(PatKind::Binding { name, mutable: true })
  }

  pub fn tuple_pat(
    &mut self,
    pats: Vec<PatId>,
  ) -> PatId {
    self.pat(PatKind::Tuple(pats))
  }

  pub fn struct_pat(
    &mut self,
    path: PathId,
    fields: Vec<(&str, Option<PatId>)>,
    rest: bool,
  ) -> PatId {
    let fields = fields
      .into_iter()
      .map(|(name, pat)| {
        let name = self.symbols.intern(name);
        let span = self.span();
        FieldPat { name, pat, span }
      })
      .collect();
    self.pat(PatKind::Struct { path, fields, rest })
  }

  pub fn tuple_struct_pat(
    &mut self,
    path: PathId,
    pats: Vec<PatId>,
  ) -> PatId {
    self.pat(PatKind::TupleStruct { path, pats })
  }

  pub fn path_pat(
    &mut self,
    path: PathId,
  ) -> PatId {
    self.pat(PatKind::Path(path))
  }

  pub fn lit_pat(
    &mut self,
    lit: Lit,
  ) -> PatId {
    self.pat(PatKind::Lit(lit))
  }

  // --- Items ---

  pub fn module(
    &mut self,
    address: &str,
    name: &str,
  ) -> ModuleItem {
    let address = self.symbols.intern(address);
    let name = self.symbols.intern(name);
    let span = self.span();
    ModuleItem::new(address, name, span)
  }

  pub fn push_module(
    &mut self,
    module: ModuleItem,
  ) {
    self.unit.modules.push(module);
  }

  pub fn function(
    &mut self,
    name: &str,
    params: Vec<ParamItem>,
    ret: Option<AnnotId>,
    body: Option<NodeId>,
  ) -> FunctionItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    FunctionItem {
      name,
      span,
      visibility: Visibility::Public,
      type_params: Vec::new(),
      params,
      ret,
      body,
      is_macro: false,
      is_spec: false,
      is_test: false,
    }
  }

  pub fn param(
    &mut self,
    name: &str,
    annot: AnnotId,
  ) -> ParamItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    ParamItem { name, span, annot }
  }

  pub fn type_param(
    &mut self,
    name: &str,
  ) -> TypeParamItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    TypeParamItem { name, span }
  }

  pub fn field_item(
    &mut self,
    name: &str,
    annot: AnnotId,
  ) -> FieldItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    FieldItem { name, span, annot }
  }

  pub fn struct_item(
    &mut self,
    name: &str,
    fields: Vec<FieldItem>,
  ) -> StructItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    StructItem {
      name,
      span,
      visibility: Visibility::Public,
      type_params: Vec::new(),
      fields,
      positional: false,
    }
  }

  pub fn const_item(
    &mut self,
    name: &str,
    annot: AnnotId,
    value: Option<NodeId>,
  ) -> ConstItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    ConstItem {
      name,
      span,
      annot,
      value,
    }
  }

  pub fn schema_item(
    &mut self,
    name: &str,
    fields: Vec<FieldItem>,
  ) -> SchemaItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    SchemaItem {
      name,
      span,
      type_params: Vec::new(),
      fields,
    }
  }

  pub fn spec_block_item(
    &mut self,
    target: Option<&str>,
    body: NodeId,
  ) -> SpecBlockItem {
    let target = target.map(|t| self.symbols.intern(t));
    let span = self.span();
    SpecBlockItem { target, span, body }
  }

  pub fn enum_item(
    &mut self,
    name: &str,
    variants: Vec<VariantItem>,
  ) -> EnumItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    EnumItem {
      name,
      span,
      visibility: Visibility::Public,
      type_params: Vec::new(),
      variants,
    }
  }

  pub fn variant_item(
    &mut self,
    name: &str,
    fields: Vec<FieldItem>,
  ) -> VariantItem {
    let name = self.symbols.intern(name);
    let span = self.span();
    VariantItem {
      name,
      span,
      fields,
      positional: false,
    }
  }

  // --- Use declarations ---

  pub fn use_module(
    &mut self,
    address: &str,
    module: &str,
    alias: Option<&str>,
  ) -> UseDecl {
    UseDecl::Module {
      address: self.symbols.intern(address),
      module: self.symbols.intern(module),
      alias: alias.map(|a| self.symbols.intern(a)),
    }
  }

  pub fn use_member(
    &mut self,
    address: &str,
    module: &str,
    member: &str,
    alias: Option<&str>,
  ) -> UseDecl {
    UseDecl::Member {
      address: self.symbols.intern(address),
      module: self.symbols.intern(module),
      member: self.symbols.intern(member),
      alias: alias.map(|a| self.symbols.intern(a)),
    }
  }

  pub fn use_fun(
    &mut self,
    function: PathId,
    receiver: PathId,
    method: &str,
    is_public: bool,
  ) -> UseDecl {
    UseDecl::Fun {
      function,
      receiver,
      method: self.symbols.intern(method),
      is_public,
    }
  }
}
