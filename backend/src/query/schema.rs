//! Schema registry: the fixed set of root operations, their arguments and
//! their output shapes.
//!
//! Built once on first use and read-only afterwards. The executor validates
//! request text against it; the binder reads argument renames and derived
//! values from it; [OperationKind] selects the resolver.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Root operations. Each one maps to exactly one resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    User,
    DepartmentMember,
    Subordinate,
    RoleMember,
    Leader,
    Department,
}

impl OperationKind {
    pub fn spec(self) -> &'static OperationSpec {
        match self {
            OperationKind::User => &USER,
            OperationKind::DepartmentMember => &DEPARTMENT_MEMBER,
            OperationKind::Subordinate => &SUBORDINATE,
            OperationKind::RoleMember => &ROLE_MEMBER,
            OperationKind::Leader => &LEADER,
            OperationKind::Department => &DEPARTMENT,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

/// Primitive kind an argument literal must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Int,
    /// Custom scalar; structure is checked when binding
    OrderList,
}

impl ArgKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ArgKind::String => "String",
            ArgKind::Int => "Int",
            ArgKind::OrderList => "orderBy",
        }
    }
}

#[derive(Debug)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    /// Filter field the value is bound to
    pub binds_to: &'static str,
}

const fn arg(name: &'static str, kind: ArgKind) -> ArgSpec {
    ArgSpec {
        name,
        kind,
        binds_to: name,
    }
}

const fn renamed(name: &'static str, binds_to: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        kind: ArgKind::String,
        binds_to,
    }
}

/// Filter values taken from the caller identity rather than the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived {
    /// `leaderID` = caller user id (required)
    LeaderFromCaller,
    /// `tenantID` = caller tenant id (optional)
    TenantFromCaller,
}

#[derive(Debug)]
pub struct OperationSpec {
    pub name: &'static str,
    pub kind: OperationKind,
    pub args: &'static [ArgSpec],
    pub derived: Option<Derived>,
    pub output: Output,
}

impl OperationSpec {
    pub fn arg(&self, name: &str) -> Option<&'static ArgSpec> {
        self.args.iter().find(|a| a.name == name)
    }
}

/// Shape of a root field's value
#[derive(Debug, Clone, Copy)]
pub enum Output {
    Object(&'static Shape),
    List(&'static Shape),
}

impl Output {
    pub fn shape(self) -> &'static Shape {
        match self {
            Output::Object(shape) | Output::List(shape) => shape,
        }
    }
}

/// Named object type and its selectable fields
#[derive(Debug)]
pub struct Shape {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Shape {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Lists are transparent: a list of objects is an `Object` field whose
/// value happens to be an array.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Scalar,
    Object(&'static Shape),
}

const fn scalar(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Scalar,
    }
}

const fn object(name: &'static str, shape: &'static Shape) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Object(shape),
    }
}

// ============================================================================
// Output shapes
// ============================================================================

pub static DEPARTMENT_REF: Shape = Shape {
    name: "department",
    fields: &[scalar("id"), scalar("name"), scalar("pid")],
};

pub static ROLE: Shape = Shape {
    name: "role",
    fields: &[scalar("id"), scalar("name")],
};

pub static LEADER_REF: Shape = Shape {
    name: "leader",
    fields: &[scalar("id"), scalar("name")],
};

pub static USER_INFO: Shape = Shape {
    name: "user",
    fields: &[
        scalar("id"),
        scalar("name"),
        scalar("phone"),
        scalar("email"),
        scalar("createdAt"),
        scalar("jobNumber"),
        scalar("avatar"),
        scalar("useStatus"),
        scalar("tenantID"),
        scalar("gender"),
        scalar("source"),
        scalar("selfEmail"),
        object("departments", &DEPARTMENT_REF),
        object("roles", &ROLE),
        object("leaders", &LEADER_REF),
    ],
};

pub static USERS: Shape = Shape {
    name: "users",
    fields: &[scalar("total"), object("users", &USER_INFO)],
};

pub static DEPARTMENT_INFO: Shape = Shape {
    name: "departmentInfo",
    fields: &[
        scalar("id"),
        scalar("name"),
        scalar("pid"),
        scalar("attr"),
        scalar("tenantID"),
    ],
};

pub static DEPARTMENTS: Shape = Shape {
    name: "departments",
    fields: &[scalar("total"), object("departments", &DEPARTMENT_INFO)],
};

// ============================================================================
// Root operations
// ============================================================================

pub static USER: OperationSpec = OperationSpec {
    name: "user",
    kind: OperationKind::User,
    args: &[
        arg("name", ArgKind::String),
        arg("phone", ArgKind::String),
        arg("email", ArgKind::String),
        arg("departmentName", ArgKind::String),
        arg("roleName", ArgKind::String),
        arg("orderBy", ArgKind::OrderList),
        arg("page", ArgKind::Int),
        arg("size", ArgKind::Int),
    ],
    derived: None,
    output: Output::Object(&USERS),
};

pub static DEPARTMENT_MEMBER: OperationSpec = OperationSpec {
    name: "departmentMember",
    kind: OperationKind::DepartmentMember,
    args: &[
        renamed("id", "departmentID"),
        arg("orderBy", ArgKind::OrderList),
        arg("page", ArgKind::Int),
        arg("size", ArgKind::Int),
    ],
    derived: None,
    output: Output::Object(&USERS),
};

pub static SUBORDINATE: OperationSpec = OperationSpec {
    name: "subordinate",
    kind: OperationKind::Subordinate,
    args: &[
        arg("orderBy", ArgKind::OrderList),
        arg("page", ArgKind::Int),
        arg("size", ArgKind::Int),
    ],
    derived: Some(Derived::LeaderFromCaller),
    output: Output::Object(&USERS),
};

pub static ROLE_MEMBER: OperationSpec = OperationSpec {
    name: "roleMember",
    kind: OperationKind::RoleMember,
    args: &[
        renamed("id", "roleID"),
        renamed("name", "roleName"),
        arg("orderBy", ArgKind::OrderList),
        arg("page", ArgKind::Int),
        arg("size", ArgKind::Int),
    ],
    derived: None,
    output: Output::Object(&USERS),
};

pub static LEADER: OperationSpec = OperationSpec {
    name: "leader",
    kind: OperationKind::Leader,
    args: &[],
    derived: None,
    output: Output::List(&USER_INFO),
};

pub static DEPARTMENT: OperationSpec = OperationSpec {
    name: "department",
    kind: OperationKind::Department,
    args: &[
        renamed("id", "ids"),
        arg("name", ArgKind::String),
        arg("orderBy", ArgKind::OrderList),
        arg("page", ArgKind::Int),
        arg("size", ArgKind::Int),
    ],
    derived: Some(Derived::TenantFromCaller),
    output: Output::Object(&DEPARTMENTS),
};

static OPERATIONS: &[&OperationSpec] = &[
    &USER,
    &DEPARTMENT_MEMBER,
    &SUBORDINATE,
    &ROLE_MEMBER,
    &LEADER,
    &DEPARTMENT,
];

static BY_NAME: Lazy<HashMap<&'static str, &'static OperationSpec>> =
    Lazy::new(|| OPERATIONS.iter().map(|op| (op.name, *op)).collect());

/// Look up a root operation by the field name used in request text.
pub fn lookup(name: &str) -> Option<&'static OperationSpec> {
    BY_NAME.get(name).copied()
}

/// Every registered root operation
pub fn operations() -> &'static [&'static OperationSpec] {
    OPERATIONS
}
