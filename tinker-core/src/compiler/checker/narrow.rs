//! Control-flow narrowing
//!
//! Conditions refine the types of access paths inside the frames pushed for
//! the guarded code. When control joins again the surviving frames are
//! merged back into their parent by union.

use super::builtins::member_type;
use super::checker::TypeChecker;
use super::env::{Frame, FrameKind};
use super::relation::is_assignable;
use super::types::{ParamType, Type};
use crate::compiler::parser::{Argument, BinaryOp, Expr, ExprKind, LogicalOp, UnaryOp};

/// Access path of a reference expression: `x`, `p.next`
pub(super) fn path_of(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(name) if &**name != "undefined" => Some(name.to_string()),
        ExprKind::Member {
            object, property, ..
        } => path_of(object).map(|p| format!("{}.{}", p, property)),
        ExprKind::Paren(inner) | ExprKind::NonNull(inner) | ExprKind::OptionalChain(inner) => {
            path_of(inner)
        }
        _ => None,
    }
}

/// Type of `name` on `ty`; every union member must have it
pub(super) fn property_of(ty: &Type, name: &str) -> Option<Type> {
    match ty {
        Type::Any => Some(Type::Any),
        Type::Union(members) => {
            let mut parts = Vec::with_capacity(members.len());
            for member in members {
                parts.push(property_of(member, name)?);
            }
            Some(Type::union(parts))
        }
        other => member_type(other, name),
    }
}

fn strip(expr: &Expr) -> &Expr {
    match &expr.kind {
        ExprKind::Paren(inner) | ExprKind::NonNull(inner) | ExprKind::OptionalChain(inner) => {
            strip(inner)
        }
        _ => expr,
    }
}

/// Unit type written as an expression: `undefined`, `null`, `"a"`, `1`, `true`
fn literal_of(expr: &Expr) -> Option<Type> {
    match &strip(expr).kind {
        ExprKind::Ident(name) if &**name == "undefined" => Some(Type::Undefined),
        ExprKind::Null => Some(Type::Null),
        ExprKind::String(s) => Some(Type::StringLit(s.clone())),
        ExprKind::Number(n) => Some(Type::NumberLit(*n)),
        ExprKind::Bool(b) => Some(Type::BoolLit(*b)),
        ExprKind::Unary {
            op: UnaryOp::Minus,
            operand,
        } => match &operand.kind {
            ExprKind::Number(n) => Some(Type::NumberLit(-n)),
            _ => None,
        },
        _ => None,
    }
}

/// `typeof x === "tag"` in either order
fn typeof_comparison<'a>(left: &'a Expr, right: &'a Expr) -> Option<(&'a Expr, &'a str)> {
    let pick = |a: &'a Expr, b: &'a Expr| match (&strip(a).kind, &strip(b).kind) {
        (
            ExprKind::Unary {
                op: UnaryOp::Typeof,
                operand,
            },
            ExprKind::String(tag),
        ) => Some((&**operand, &**tag)),
        _ => None,
    };
    pick(left, right).or_else(|| pick(right, left))
}

/// Members of `ty` that may equal the unit type `lit`
fn filter_literal(ty: &Type, lit: &Type, strict: bool, positive: bool) -> Type {
    let loose_nullish = !strict && lit.is_nullish();
    if matches!(ty, Type::Any) {
        return Type::Any;
    }
    if matches!(ty, Type::Unknown) {
        return match (positive, loose_nullish) {
            (true, true) => Type::union([Type::Undefined, Type::Null]),
            (true, false) => lit.clone(),
            (false, _) => Type::Unknown,
        };
    }
    let members = ty.members().iter();
    if positive {
        Type::union(members.filter_map(|m| {
            if loose_nullish {
                return m.is_nullish().then(|| m.clone());
            }
            if m == lit || (*m == Type::Void && *lit == Type::Undefined) {
                return Some(lit.clone());
            }
            (lit.widen() == *m).then(|| lit.clone())
        }))
    } else {
        Type::union(members.filter_map(|m| {
            if loose_nullish {
                return (!m.is_nullish()).then(|| m.clone());
            }
            if let (Type::Boolean, Type::BoolLit(b)) = (m, lit) {
                return Some(Type::BoolLit(!b));
            }
            let same = m == lit || (*m == Type::Void && *lit == Type::Undefined);
            (!same).then(|| m.clone())
        }))
    }
}

fn typeof_primitive(tag: &str) -> Option<Type> {
    Some(match tag {
        "string" => Type::String,
        "number" => Type::Number,
        "boolean" => Type::Boolean,
        "undefined" => Type::Undefined,
        "function" => Type::function(
            vec![ParamType {
                rest: true,
                ..ParamType::new("args", Type::array(Type::Any))
            }],
            Type::Any,
        ),
        "object" => Type::union([Type::object(Vec::new()), Type::Null]),
        _ => return None,
    })
}

fn instance_type(name: &str) -> Option<Type> {
    Some(match name {
        "Error" | "TypeError" | "RangeError" | "ReferenceError" | "SyntaxError" => Type::Error,
        "Array" => Type::array(Type::Any),
        "Promise" => Type::Promise(Box::new(Type::Any)),
        _ => return None,
    })
}

/// Narrowing entry a frame holds for a path, honoring tombstoned prefixes
fn frame_entry(frame: &Frame, path: &str) -> Option<Option<Type>> {
    if let Some(entry) = frame.narrowed.get(path) {
        return Some(entry.clone());
    }
    let tombstoned = path
        .match_indices('.')
        .any(|(i, _)| matches!(frame.narrowed.get(&path[..i]), Some(None)));
    tombstoned.then_some(None)
}

impl TypeChecker {
    /// Current type of an access path
    pub(super) fn path_type(&self, path: &str) -> Option<Type> {
        if let Some(ty) = self.env.narrowed(path) {
            return Some(ty.clone());
        }
        self.base_type(path)
    }

    /// Type of an access path ignoring its own narrowing
    pub(super) fn base_type(&self, path: &str) -> Option<Type> {
        match path.rsplit_once('.') {
            None => self.env.lookup(path).map(|b| b.declared.clone()),
            Some((parent, name)) => {
                let parent = self.path_type(parent)?;
                property_of(&parent.non_nullable(), name)
            }
        }
    }

    pub(super) fn lookup_property(&self, ty: &Type, name: &str) -> Option<Type> {
        property_of(ty, name)
    }

    fn set_narrowing(&mut self, path: &str, narrowed: Type, current: &Type) {
        if narrowed != *current {
            self.env.narrow(path.to_string(), narrowed);
        }
    }

    /// Refine paths assuming `test` evaluated to `truthy`
    pub(super) fn narrow_condition(&mut self, test: &Expr, truthy: bool) {
        match &test.kind {
            ExprKind::Paren(inner) => self.narrow_condition(inner, truthy),
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.narrow_condition(operand, !truthy),
            ExprKind::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => {
                if truthy {
                    self.narrow_condition(left, true);
                    self.narrow_condition(right, true);
                } else {
                    self.narrow_either(
                        |c| c.narrow_condition(left, false),
                        |c| {
                            c.narrow_condition(left, true);
                            c.narrow_condition(right, false);
                        },
                    );
                }
            }
            ExprKind::Logical {
                op: LogicalOp::Or,
                left,
                right,
            } => {
                if truthy {
                    self.narrow_either(
                        |c| c.narrow_condition(left, true),
                        |c| {
                            c.narrow_condition(left, false);
                            c.narrow_condition(right, true);
                        },
                    );
                } else {
                    self.narrow_condition(left, false);
                    self.narrow_condition(right, false);
                }
            }
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::StrictEq | BinaryOp::Eq | BinaryOp::StrictNotEq | BinaryOp::NotEq => {
                    let strict = matches!(op, BinaryOp::StrictEq | BinaryOp::StrictNotEq);
                    let positive = matches!(op, BinaryOp::StrictEq | BinaryOp::Eq) == truthy;
                    self.narrow_equality(left, right, strict, positive);
                }
                BinaryOp::Instanceof => self.narrow_instanceof(left, right, truthy),
                BinaryOp::In => self.narrow_in(left, right, truthy),
                _ => {}
            },
            ExprKind::Call { callee, args, .. } => {
                if let (ExprKind::Member { object, property, .. }, [Argument::Expr(arg)]) =
                    (&strip(callee).kind, args.as_slice())
                {
                    let is_array_check = matches!(&strip(object).kind, ExprKind::Ident(name) if &**name == "Array")
                        && &**property == "isArray";
                    if is_array_check {
                        self.narrow_array_check(arg, truthy);
                    }
                }
            }
            _ => {
                if let Some(path) = path_of(test) {
                    self.narrow_truthiness(&path, truthy);
                }
            }
        }
    }

    /// Apply the union of two alternative narrowings
    fn narrow_either(&mut self, first: impl FnOnce(&mut Self), second: impl FnOnce(&mut Self)) {
        self.env.push(FrameKind::Branch);
        first(self);
        let a = self.env.pop();
        self.env.push(FrameKind::Branch);
        second(self);
        let b = self.env.pop();
        self.merge_live(vec![a, b], false);
    }

    fn narrow_truthiness(&mut self, path: &str, truthy: bool) {
        let Some(current) = self.path_type(path) else {
            return;
        };
        let narrowed = if truthy {
            current.truthy_part()
        } else {
            current.falsy_part()
        };
        self.set_narrowing(path, narrowed, &current);
        if truthy {
            self.narrow_prefixes_present(path);
        }
    }

    /// `a.b.c` evaluating to a value means `a` and `a.b` were present
    fn narrow_prefixes_present(&mut self, path: &str) {
        let prefixes: Vec<&str> = path.match_indices('.').map(|(i, _)| &path[..i]).collect();
        for prefix in prefixes {
            if let Some(current) = self.path_type(prefix) {
                let present = current.non_nullable();
                self.set_narrowing(prefix, present, &current);
            }
        }
    }

    /// `left == right` held (`positive`) or failed
    pub(super) fn narrow_equality(&mut self, left: &Expr, right: &Expr, strict: bool, positive: bool) {
        if let Some((operand, tag)) = typeof_comparison(left, right) {
            self.narrow_typeof(operand, tag, positive);
            return;
        }
        let (target, lit) = match (literal_of(right), literal_of(left)) {
            (Some(lit), _) => (left, lit),
            (None, Some(lit)) => (right, lit),
            _ => return,
        };
        let Some(path) = path_of(target) else {
            return;
        };
        if let Some(current) = self.path_type(&path) {
            let narrowed = filter_literal(&current, &lit, strict, positive);
            self.set_narrowing(&path, narrowed, &current);
        }
        if positive && !lit.is_nullish() {
            self.narrow_prefixes_present(&path);
        }
        if let ExprKind::Member {
            object, property, ..
        } = &strip(target).kind
        {
            if let Some(object_path) = path_of(object) {
                self.narrow_discriminant(&object_path, property, &lit, positive);
            }
        }
    }

    /// `a.kind === "x"` keeps the members of `a` whose `kind` can be `"x"`
    fn narrow_discriminant(&mut self, path: &str, property: &str, lit: &Type, positive: bool) {
        let Some(current) = self.path_type(path) else {
            return;
        };
        if !matches!(current, Type::Union(_)) {
            return;
        }
        let kept = Type::union(
            current
                .members()
                .iter()
                .filter(|member| {
                    if member.is_nullish() {
                        return !positive;
                    }
                    let Some(prop) = property_of(member, property) else {
                        return true;
                    };
                    if positive {
                        prop.members()
                            .iter()
                            .any(|p| p == lit || p.is_any() || lit.widen() == *p)
                    } else {
                        prop != *lit
                    }
                })
                .cloned(),
        );
        self.set_narrowing(path, kept, &current);
    }

    fn narrow_typeof(&mut self, operand: &Expr, tag: &str, positive: bool) {
        let Some(path) = path_of(operand) else {
            return;
        };
        let Some(current) = self.path_type(&path) else {
            return;
        };
        let narrowed = if matches!(current, Type::Any | Type::Unknown) {
            match typeof_primitive(tag) {
                Some(ty) if positive => ty,
                _ => return,
            }
        } else {
            Type::union(
                current
                    .members()
                    .iter()
                    .filter(|m| (m.typeof_tag() == Some(tag)) == positive)
                    .cloned(),
            )
        };
        self.set_narrowing(&path, narrowed, &current);
    }

    fn narrow_instanceof(&mut self, left: &Expr, right: &Expr, positive: bool) {
        let ExprKind::Ident(class_name) = &strip(right).kind else {
            return;
        };
        let Some(class) = instance_type(class_name) else {
            return;
        };
        let Some(path) = path_of(left) else {
            return;
        };
        let Some(current) = self.path_type(&path) else {
            return;
        };
        let narrowed = match (&current, positive) {
            (Type::Any | Type::Unknown, true) => class,
            (Type::Any | Type::Unknown, false) => return,
            (_, true) => {
                let kept = Type::union(
                    current
                        .members()
                        .iter()
                        .filter(|m| is_assignable(m, &class))
                        .cloned(),
                );
                if kept == Type::Never {
                    class
                } else {
                    kept
                }
            }
            (_, false) => Type::union(
                current
                    .members()
                    .iter()
                    .filter(|m| !is_assignable(m, &class))
                    .cloned(),
            ),
        };
        self.set_narrowing(&path, narrowed, &current);
    }

    /// `"key" in x`
    fn narrow_in(&mut self, left: &Expr, right: &Expr, positive: bool) {
        let ExprKind::String(key) = &strip(left).kind else {
            return;
        };
        let Some(path) = path_of(right) else {
            return;
        };
        let Some(current) = self.path_type(&path) else {
            return;
        };
        if !matches!(current, Type::Union(_)) {
            return;
        }
        let kept = Type::union(
            current
                .members()
                .iter()
                .filter(|m| {
                    let has = match m {
                        Type::Object(obj) => match obj.prop(key) {
                            Some(prop) => !prop.optional || positive,
                            None => obj.index.is_some() && positive,
                        },
                        _ => positive,
                    };
                    has == positive
                })
                .cloned(),
        );
        self.set_narrowing(&path, kept, &current);
    }

    fn narrow_array_check(&mut self, arg: &Expr, positive: bool) {
        let Some(path) = path_of(arg) else {
            return;
        };
        let Some(current) = self.path_type(&path) else {
            return;
        };
        let is_array = |t: &Type| matches!(t, Type::Array(_) | Type::Tuple(_));
        let narrowed = match (&current, positive) {
            (Type::Any | Type::Unknown, true) => Type::array(Type::Any),
            (Type::Any | Type::Unknown, false) => return,
            (_, true) => {
                let kept = Type::union(current.members().iter().filter(|m| is_array(m)).cloned());
                if kept == Type::Never {
                    Type::array(Type::Any)
                } else {
                    kept
                }
            }
            (_, false) => Type::union(current.members().iter().filter(|m| !is_array(m)).cloned()),
        };
        self.set_narrowing(&path, narrowed, &current);
    }

    // ---- joins ----

    /// Join after a conditional statement; only frames whose end is reachable contribute
    pub(super) fn merge_branches(&mut self, frames: Vec<Frame>) {
        let any_broken = frames.iter().any(|f| f.broken);
        let live: Vec<Frame> = frames.into_iter().filter(|f| !f.terminated).collect();
        if live.is_empty() {
            if any_broken {
                self.env.break_out();
            } else {
                self.env.terminate();
            }
            return;
        }
        self.merge_live(live, false);
    }

    /// Join where the code before the frames may also flow past them, as with loops
    pub(super) fn merge_with_outer(&mut self, frames: Vec<Frame>) {
        self.merge_live(frames, true);
    }

    pub(super) fn merge_live(&mut self, frames: Vec<Frame>, include_outer: bool) {
        if frames.is_empty() {
            if !include_outer {
                self.env.terminate();
            }
            return;
        }
        let mut paths: Vec<String> = Vec::new();
        for frame in &frames {
            for (path, _) in frame.escaping() {
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            }
        }
        // parents first, so children see the joined parent type
        paths.sort_by_key(|p| p.matches('.').count());
        for path in paths {
            let outer = self.path_type(&path);
            let mut parts = Vec::with_capacity(frames.len() + 1);
            let mut known = true;
            for frame in &frames {
                let part = match frame_entry(frame, &path) {
                    Some(Some(ty)) => Some(ty),
                    Some(None) => self.base_type(&path),
                    None => outer.clone(),
                };
                match part {
                    Some(ty) => parts.push(ty),
                    None => known = false,
                }
            }
            if include_outer {
                match &outer {
                    Some(ty) => parts.push(ty.clone()),
                    None => known = false,
                }
            }
            if !known {
                self.env.invalidate(&path);
                continue;
            }
            let merged = Type::union(parts);
            if outer.as_ref() != Some(&merged) {
                self.env.narrow(path, merged);
            }
        }
    }
}
