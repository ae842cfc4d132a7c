//! 流消息日志
//!
//! 客户端和服务端流包装器共用。每次操作都从包装时的上下文快照克隆一份，
//! 各自添加字段，互不影响。

use super::lifecycle::{Kind, Lifecycle};
use crate::logger::{Level, LogContext, Payload, SharedLogger, Value, emit};
use crate::options::{
    DURATION_KEY, METADATA_KEY, Options, RECV_DATA_KEY, SEND_DATA_KEY, add_error_fields,
};
use std::sync::Arc;
use std::time::Duration;
use tonic::Status;
use tonic::metadata::MetadataMap;

pub(crate) struct StreamLog {
    kind: Kind,
    options: Arc<Options>,
    logger: SharedLogger,
    context: LogContext,
}

impl StreamLog {
    pub(crate) fn new(kind: Kind, lifecycle: &Lifecycle) -> Self {
        Self {
            kind,
            options: lifecycle.options().clone(),
            logger: lifecycle.logger().clone(),
            context: lifecycle.snapshot(),
        }
    }

    pub(crate) fn sent(&self, payload: Value, duration: Duration, result: &Result<(), Status>) {
        let mut context = self.context.clone();
        context
            .add(SEND_DATA_KEY, payload)
            .add(DURATION_KEY, duration.as_secs_f64());

        match result {
            Ok(()) => self.debug("stream send message", &context),
            Err(status) => self.error("stream send error", status, &mut context),
        }
    }

    pub(crate) fn received<M>(&self, duration: Duration, result: &Result<Option<M>, Status>)
    where
        M: Payload + Clone,
    {
        let mut context = self.context.clone();
        context.add(DURATION_KEY, duration.as_secs_f64());

        match result {
            Ok(None) => self.debug("stream receive EOF", &context),
            Ok(Some(message)) => {
                context.add(RECV_DATA_KEY, Value::payload(message.clone()));
                self.debug("stream receive message", &context);
            }
            Err(status) => self.error("stream receive error", status, &mut context),
        }
    }

    pub(crate) fn header_sent(&self, metadata: MetadataMap, result: &Result<(), Status>) {
        let mut context = self.context.clone();
        context.add(METADATA_KEY, Value::payload(metadata));

        match result {
            Ok(()) => self.debug("stream send header", &context),
            Err(status) => self.error("stream send header error", status, &mut context),
        }
    }

    fn debug(&self, event: &str, context: &LogContext) {
        emit(
            self.logger.as_ref(),
            &format!("grpc {} {}", self.kind.as_str(), event),
            Level::Debug,
            context,
        );
    }

    fn error(&self, event: &str, status: &Status, context: &mut LogContext) {
        let code = self.options.code_for(status);
        add_error_fields(context, status, code);
        emit(
            self.logger.as_ref(),
            &format!("grpc {} {}", self.kind.as_str(), event),
            self.options.level_for(code),
            context,
        );
    }
}
