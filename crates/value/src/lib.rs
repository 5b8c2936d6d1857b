pub mod environment;
pub mod value;

pub use environment::{Environment, SharedEnv, StructDef, Visibility};
pub use value::{
    ArrayValue, Builtin, BodyHandle, EnumDef, EnumInstance, ErrorValue, FunctionValue,
    IntegerValue, MapKey, MapValue, ModuleValue, Param, StringValue, StructValue, Value,
};
