// ==========================================
// 台账导入管道 - 实体导入服务
// ==========================================
// 契约: process_file(path) -> ImportResult（调度器唯一依赖的接口）
// 实现: 一个通用引擎 + 每种实体一份布局配置
// ==========================================

use crate::config::ImportSettings;
use crate::domain::{ImportResult, TargetData};
use crate::importer::batch_engine::BatchImportEngine;
use crate::importer::entity_profile::EntityProfile;
use crate::importer::profiles::profile_for;
use crate::repository::{EntityRecordRepository, EntityRecordRepositoryImpl};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ==========================================
// EntityImportService Trait
// ==========================================
// 实现者: TableImportService（按布局驱动批次引擎）
pub trait EntityImportService: Send + Sync {
    fn target(&self) -> TargetData;

    /// 导入一个文件；预期内的失败（文件不可读、表头不匹配）以结果值返回
    fn process_file(&self, file_path: &Path) -> ImportResult;
}

pub struct TableImportService<R>
where
    R: EntityRecordRepository,
{
    engine: Arc<BatchImportEngine<R>>,
    profile: &'static EntityProfile,
}

impl<R> TableImportService<R>
where
    R: EntityRecordRepository,
{
    pub fn new(engine: Arc<BatchImportEngine<R>>, profile: &'static EntityProfile) -> Self {
        Self { engine, profile }
    }
}

impl<R> EntityImportService for TableImportService<R>
where
    R: EntityRecordRepository,
{
    fn target(&self) -> TargetData {
        self.profile.target
    }

    fn process_file(&self, file_path: &Path) -> ImportResult {
        self.engine.import_file(self.profile, file_path)
    }
}

// ==========================================
// ImportServiceRegistry - 判别值 → 服务
// ==========================================
#[derive(Default)]
pub struct ImportServiceRegistry {
    services: HashMap<TargetData, Box<dyn EntityImportService>>,
}

impl ImportServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册六种实体服务（共用同一连接与同一引擎）
    pub fn with_default_services(conn: Arc<Mutex<Connection>>, settings: ImportSettings) -> Self {
        let engine = Arc::new(BatchImportEngine::new(
            EntityRecordRepositoryImpl::new(conn),
            settings,
        ));

        let mut registry = Self::new();
        for target in TargetData::ALL {
            registry.register(Box::new(TableImportService::new(
                Arc::clone(&engine),
                profile_for(target),
            )));
        }
        registry
    }

    /// 注册服务（同一目标重复注册时覆盖）
    pub fn register(&mut self, service: Box<dyn EntityImportService>) {
        self.services.insert(service.target(), service);
    }

    /// 按任务中的 target_data_name 查找服务；未知判别值返回 None
    pub fn resolve(&self, target_data_name: &str) -> Option<&dyn EntityImportService> {
        TargetData::parse(target_data_name)
            .and_then(|target| self.services.get(&target))
            .map(|service| service.as_ref())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
