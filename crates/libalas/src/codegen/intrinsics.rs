//! Runtime intrinsics the generated IR links against.
//!
//! Strings, arrays and maps exist in compiled code as opaque `ptr` values
//! managed by the native runtime; every operation on them lowers to a
//! call of one of these symbols. Numeric values cross the boundary by
//! boxing (`alas_box_*`) and unboxing (`alas_value_*`). At link time a
//! C-ABI shim over the runtime provides the definitions; the code
//! generator only ever declares them.

use super::ir::{IrExternal, IrType};

pub const BOX_INT: &str = "alas_box_int";
pub const BOX_FLOAT: &str = "alas_box_float";
pub const BOX_BOOL: &str = "alas_box_bool";
pub const VALUE_INT: &str = "alas_value_int";
pub const VALUE_FLOAT: &str = "alas_value_float";
pub const VALUE_TRUTHY: &str = "alas_value_truthy";
pub const VALUE_EQ: &str = "alas_value_eq";
pub const VALUE_INDEX: &str = "alas_value_index";
pub const STR_CONST: &str = "alas_str_const";
pub const STR_CONCAT: &str = "alas_str_concat";
pub const STR_CMP: &str = "alas_str_cmp";
pub const ARRAY_NEW: &str = "alas_array_new";
pub const ARRAY_PUSH: &str = "alas_array_push";
pub const MAP_NEW: &str = "alas_map_new";
pub const MAP_SET: &str = "alas_map_set";

/// The declared signature of a runtime intrinsic.
pub fn external(name: &str) -> IrExternal {
    use IrType::{F64, I1, I64, Ptr, Void};
    let (params, ret): (Vec<IrType>, IrType) = match name {
        BOX_INT => (vec![I64], Ptr),
        BOX_FLOAT => (vec![F64], Ptr),
        BOX_BOOL => (vec![I1], Ptr),
        VALUE_INT => (vec![Ptr], I64),
        VALUE_FLOAT => (vec![Ptr], F64),
        VALUE_TRUTHY => (vec![Ptr], I1),
        VALUE_EQ => (vec![Ptr, Ptr], I1),
        VALUE_INDEX => (vec![Ptr, Ptr], Ptr),
        STR_CONST => (vec![Ptr], Ptr),
        STR_CONCAT => (vec![Ptr, Ptr], Ptr),
        STR_CMP => (vec![Ptr, Ptr], I64),
        ARRAY_NEW => (vec![I64], Ptr),
        ARRAY_PUSH => (vec![Ptr, Ptr], Void),
        MAP_NEW => (Vec::new(), Ptr),
        MAP_SET => (vec![Ptr, Ptr, Ptr], Void),
        other => unreachable!("unknown intrinsic {other}"),
    };
    IrExternal {
        name: name.to_string(),
        params,
        ret,
    }
}
