mod kv;
pub use kv::{KeyValue, NameValue, to_key_values, to_name_values};

mod task_status;
pub use task_status::TaskStatus;

mod task_run;
pub use task_run::{ContainerDescription, TaskDescription, TaskRunRecord};

mod logs;
pub use logs::{LogCursor, LogEvent, LogEventsPage, LogEventsQuery};

mod network;
pub use network::{ASSIGN_PUBLIC_IP_ENABLED, AwsVpcConfiguration, Network, NetworkConfiguration, Subnet};

mod result;
pub use result::{ExecutionResult, UNKNOWN_EXIT_CODE};

/// Amazon Resource Name of a registered document or a running task.
pub type Arn = String;

/// Cache key identifying a deployment or job across invocations.
pub type CacheKey = String;
