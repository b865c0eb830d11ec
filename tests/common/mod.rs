#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pipewright::execution::{
    BlockExecutor, BlockMeta, ExecutionContext, ExecutionResult, ExecutorRegistry,
};
use pipewright::table::{IoType, IoValue, Sheet, Table};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn sheet(rows: &[&[&str]]) -> Sheet {
    Sheet::from_rows(rows.iter().map(|row| row.iter().copied()))
}

/// Source block handing out a fixed sheet.
pub struct SheetSource {
    meta: BlockMeta,
    sheet: Sheet,
}

#[async_trait]
impl BlockExecutor for SheetSource {
    fn meta(&self) -> &BlockMeta {
        &self.meta
    }

    async fn execute(
        &self,
        _input: IoValue,
        _context: &ExecutionContext,
    ) -> ExecutionResult<IoValue> {
        Ok(IoValue::Sheet(self.sheet.clone()))
    }
}

/// Sink block remembering every table it receives.
#[derive(Default)]
pub struct TableCollector {
    tables: Mutex<Vec<Table>>,
}

impl TableCollector {
    pub fn tables(&self) -> Vec<Table> {
        self.tables.lock().unwrap().clone()
    }
}

pub struct CollectingSink {
    meta: BlockMeta,
    collector: Arc<TableCollector>,
}

#[async_trait]
impl BlockExecutor for CollectingSink {
    fn meta(&self) -> &BlockMeta {
        &self.meta
    }

    async fn execute(
        &self,
        input: IoValue,
        _context: &ExecutionContext,
    ) -> ExecutionResult<IoValue> {
        if let IoValue::Table(table) = input {
            self.collector.tables.lock().unwrap().push(table);
        }
        Ok(IoValue::None)
    }
}

/// Standard executors plus `SheetSource` (serving `sheet`) and `TableSink`.
pub fn registry_with(sheet: Sheet) -> (ExecutorRegistry, Arc<TableCollector>) {
    let collector = Arc::new(TableCollector::default());
    let mut registry = ExecutorRegistry::with_standard_executors();
    registry.register_block(Arc::new(SheetSource {
        meta: BlockMeta::new("SheetSource", IoType::None, IoType::Sheet),
        sheet,
    }));
    registry.register_block(Arc::new(CollectingSink {
        meta: BlockMeta::new("TableSink", IoType::Table, IoType::None),
        collector: collector.clone(),
    }));
    (registry, collector)
}
