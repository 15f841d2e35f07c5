// ==========================================
// 台账导入管道 - 行批次导入引擎
// ==========================================
// 流程: 打开文件 → 表头校验 → 逐行（跳过空行 → 必填校验 → 映射
//       → 主键存在性 → 路由到插入/更新）→ 阈值提交 → 收尾提交 → 汇总
// 事务: 每次批次提交一个短事务，失败只回滚该批次
// 内存: 行游标只进不退，缓冲不超过一个批次
// ==========================================

use crate::config::ImportSettings;
use crate::domain::{FieldRecord, ImportResult};
use crate::importer::entity_profile::{EntityProfile, UpdateMode};
use crate::importer::header_validator::HeaderValidator;
use crate::importer::tabular_reader::{TabularReader, UniversalTabularReader};
use crate::perf::{resident_memory_kb, PerfGuard};
use crate::repository::{EntityRecordRepository, TableTarget};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// RowBatch - 待提交的行缓冲
// ==========================================
#[derive(Debug)]
pub struct RowBatch {
    records: Vec<FieldRecord>,
    threshold: usize,
}

impl RowBatch {
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            records: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// 追加一行，返回是否已达到提交阈值
    pub fn push(&mut self, record: FieldRecord) -> bool {
        self.records.push(record);
        self.records.len() >= self.threshold
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 取出全部行并清空缓冲（无论提交成功与否）
    pub fn take(&mut self) -> Vec<FieldRecord> {
        std::mem::replace(&mut self.records, Vec::with_capacity(self.threshold))
    }
}

/// 批次覆盖的源文件行号范围，用于诊断
fn row_span(records: &[FieldRecord]) -> String {
    match (records.first(), records.last()) {
        (Some(first), Some(last)) if first.row_number != last.row_number => {
            format!("第 {}-{} 行", first.row_number, last.row_number)
        }
        (Some(first), _) => format!("第 {} 行", first.row_number),
        _ => String::new(),
    }
}

// ==========================================
// BatchImportEngine - 通用批次导入引擎
// ==========================================
pub struct BatchImportEngine<R>
where
    R: EntityRecordRepository,
{
    repo: R,
    reader: Box<dyn TabularReader>,
    settings: ImportSettings,
}

impl<R> BatchImportEngine<R>
where
    R: EntityRecordRepository,
{
    /// 创建引擎（默认按扩展名选择读取器）
    pub fn new(repo: R, settings: ImportSettings) -> Self {
        Self::with_reader(repo, Box::new(UniversalTabularReader), settings)
    }

    pub fn with_reader(repo: R, reader: Box<dyn TabularReader>, settings: ImportSettings) -> Self {
        Self {
            repo,
            reader,
            settings,
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// 导入一个文件
    ///
    /// # 返回
    /// - 文件级失败（无法打开/表头不匹配）: completed=false，零行处理、零写入
    /// - 否则: completed=true，success 仅在无任何跳过/错误时为 true
    #[instrument(skip(self, profile, file_path), fields(entity = %profile.target, table = profile.table))]
    pub fn import_file(&self, profile: &EntityProfile, file_path: &Path) -> ImportResult {
        let _perf = PerfGuard::new("import_file").with_label(profile.table);
        let started = Instant::now();
        info!(file = %file_path.display(), batch_size = self.settings.batch_size, "开始导入文件");

        // 1. 打开文件
        let mut cursor = match self.reader.open(file_path, profile.read_filter()) {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!(error = %e, "文件无法读取");
                return ImportResult::failure(format!("文件无法读取: {}", e));
            }
        };

        // 2. 表头校验
        let header = match cursor.next() {
            Some(Ok(row)) => Some(row),
            Some(Err(e)) => {
                warn!(error = %e, "表头行读取失败");
                return ImportResult::failure(format!("表头行读取失败: {}", e));
            }
            None => None,
        };
        if let Err(e) =
            HeaderValidator::validate(profile.header_row, header.as_ref(), profile.expected_header)
        {
            warn!(error = %e, "表头校验失败，中止导入");
            return ImportResult::failure(e.to_string());
        }

        // 3. 逐行处理
        let target = TableTarget {
            table: profile.table,
            key_fields: profile.key_fields,
        };
        let mut result = ImportResult::default();
        let mut inserts = RowBatch::new(self.settings.batch_size);
        let mut updates = RowBatch::new(self.settings.batch_size);
        let mut read_error = None;

        for item in cursor {
            let row = match item {
                Ok(row) => row,
                Err(e) => {
                    error!(error = %e, processed_rows = result.processed_rows, "读取中断");
                    read_error = Some(e.to_string());
                    break;
                }
            };

            if row.is_blank() {
                continue;
            }
            result.processed_rows += 1;
            self.log_progress(&result);

            let record = profile.map_row(&row, self.settings.decimal_scale);
            let missing = profile.missing_required(&record);
            if !missing.is_empty() {
                debug!(row = row.row_number, missing = ?missing, "必填字段缺失，跳过");
                result.skip_row(format!(
                    "第 {} 行: 必填字段缺失 [{}]",
                    row.row_number,
                    missing.join(", ")
                ));
                continue;
            }

            let exists = match self.repo.exists(target, &record) {
                Ok(exists) => exists,
                Err(e) => {
                    warn!(row = row.row_number, error = %e, "主键查询失败，跳过");
                    result.skip_row(format!(
                        "第 {} 行: 主键查询失败 ({}): {}",
                        row.row_number,
                        record.key_display(profile.key_fields),
                        e
                    ));
                    continue;
                }
            };

            match (exists, profile.update_mode) {
                (false, _) => {
                    if inserts.push(record) {
                        self.flush_inserts(target, &mut inserts, &mut result);
                    }
                }
                (true, UpdateMode::Batched) => {
                    if updates.push(record) {
                        self.flush_updates(target, &mut updates, &mut result);
                    }
                }
                (true, UpdateMode::Immediate) => {
                    self.update_immediately(target, &record, &mut result);
                }
            }
        }

        // 4. 收尾提交
        self.flush_inserts(target, &mut inserts, &mut result);
        self.flush_updates(target, &mut updates, &mut result);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if let Some(e) = read_error {
            // 已提交的批次保留，任务按文件级失败处理
            result.elapsed_ms = elapsed_ms;
            result.success = false;
            result.message = format!(
                "文件读取中断: {} (已处理 {} 行, 新增 {} 行, 更新 {} 行, 跳过 {} 行)",
                e,
                result.processed_rows,
                result.imported_count,
                result.updated_count,
                result.skipped_count
            );
            result.error_messages.push(format!("文件读取中断: {}", e));
            return result;
        }

        result.finish(elapsed_ms);
        info!(
            processed_rows = result.processed_rows,
            imported = result.imported_count,
            updated = result.updated_count,
            skipped = result.skipped_count,
            insert_flushes = result.insert_flushes,
            update_flushes = result.update_flushes,
            elapsed_ms,
            "文件导入完成"
        );
        result
    }

    /// 提交插入批次；被 INSERT OR IGNORE 忽略的行计为跳过
    fn flush_inserts(
        &self,
        target: TableTarget<'static>,
        batch: &mut RowBatch,
        result: &mut ImportResult,
    ) {
        if batch.is_empty() {
            return;
        }
        let records = batch.take();
        let requested = records.len();
        let span = row_span(&records);
        let _perf = PerfGuard::new("flush_insert_batch").with_label(target.table);
        result.insert_flushes += 1;

        match self.repo.batch_insert(target, &records) {
            Ok(inserted) => {
                result.imported_count += inserted;
                let ignored = requested.saturating_sub(inserted);
                if ignored > 0 {
                    result.skipped_count += ignored;
                    result.error_messages.push(format!(
                        "{} 批次: {} 行因业务主键重复被忽略",
                        span, ignored
                    ));
                }
                debug!(requested, inserted, "插入批次已提交");
            }
            Err(e) => {
                error!(requested, error = %e, "插入批次失败，已回滚");
                result.skipped_count += requested;
                result.error_messages.push(format!(
                    "{} 批次插入失败，已回滚 {} 行: {}",
                    span, requested, e
                ));
            }
        }
    }

    /// 提交更新批次；影响行数不一致或数据库错误时整批回滚并计为跳过
    fn flush_updates(
        &self,
        target: TableTarget<'static>,
        batch: &mut RowBatch,
        result: &mut ImportResult,
    ) {
        if batch.is_empty() {
            return;
        }
        let records = batch.take();
        let requested = records.len();
        let span = row_span(&records);
        let _perf = PerfGuard::new("flush_update_batch").with_label(target.table);
        result.update_flushes += 1;

        match self.repo.batch_update(target, &records) {
            Ok(updated) => {
                result.updated_count += updated;
                debug!(requested, updated, "更新批次已提交");
            }
            Err(e) => {
                error!(requested, error = %e, "更新批次失败，已回滚");
                result.skipped_count += requested;
                result.error_messages.push(format!(
                    "{} 批次更新失败，已回滚 {} 行: {}",
                    span, requested, e
                ));
            }
        }
    }

    fn update_immediately(
        &self,
        target: TableTarget<'_>,
        record: &FieldRecord,
        result: &mut ImportResult,
    ) {
        match self.repo.update_one(target, record) {
            Ok(updated) => result.updated_count += updated,
            Err(e) => {
                warn!(row = record.row_number, error = %e, "单行更新失败，跳过");
                result.skip_row(format!(
                    "第 {} 行: 更新失败 ({}): {}",
                    record.row_number,
                    record.key_display(target.key_fields),
                    e
                ));
            }
        }
    }

    fn log_progress(&self, result: &ImportResult) {
        let interval = self.settings.memory_log_interval_rows;
        if interval == 0 || result.processed_rows % interval != 0 {
            return;
        }
        info!(
            processed_rows = result.processed_rows,
            imported = result.imported_count,
            updated = result.updated_count,
            skipped = result.skipped_count,
            rss_kb = resident_memory_kb().unwrap_or(0),
            "导入进度"
        );
    }
}
