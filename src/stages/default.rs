use crate::dispatch::{Next, Stage};
use crate::error::Result;
use crate::value::{CallRecord, Value};

/// Tail of every chain: the break protocol and history bookkeeping.
pub struct DefaultStage;

impl Stage for DefaultStage {
    fn pre(&self, call: &CallRecord, next: Next<'_>) -> Result<Option<Value>> {
        next.interceptor().controller().pre_call(call)?;
        next.pre(call)
    }

    fn post(&self, call: &CallRecord, ret: Option<&Value>, next: Next<'_>) -> Result<()> {
        next.interceptor().controller().post_call(ret)?;
        next.post(call, ret)
    }
}
