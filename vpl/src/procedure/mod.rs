use crate::language::argument::ArgumentValue;
use crate::statement::identity::InstanceId;

/// Bookkeeping for one placed invocation of a user procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializedProcedure {
    /// Identity of the invoking statement.
    pub identity: InstanceId,
    pub procedure: String,
    /// Values bound inside the instantiated body, in pre-order.
    pub devices: Vec<DeviceBinding>,
}

/// A value bound by one statement inside an instantiated procedure body.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBinding {
    pub statement: InstanceId,
    pub value: ArgumentValue,
}
