//! One CSV file per product and pass.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::Local;
use tracing::{error, info};

use super::{ExportDir, ExportFailure, ExportSink, ExportSummary};
use crate::monitor::{DeficiencyGroups, DeficiencyRecord};
use crate::utils::filename::sanitize_product_name;
use crate::utils::fs::{ensure_dir_all_with_op, io_error};
use crate::{Error, Result};

/// Column titles, in file order.
pub const CSV_HEADERS: [&str; 11] = [
    "商品名称",
    "商品ID",
    "链接",
    "订单号",
    "订单ID",
    "第三方订单号",
    "缺失数量",
    "订单金额",
    "订单数量",
    "初始数量",
    "当前数量",
];

/// Spreadsheet applications need the BOM to detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub struct CsvExportSink {
    dir: ExportDir,
}

impl CsvExportSink {
    pub fn new(dir: ExportDir) -> Self {
        Self { dir }
    }
}

fn record_row(record: &DeficiencyRecord) -> [String; 11] {
    [
        record.product_name.clone(),
        record.product_id.to_string(),
        record.link.clone(),
        record.order_sn.clone(),
        record.order_id.to_string(),
        record.third_party_sn.clone().unwrap_or_default(),
        record.shortfall.to_string(),
        record.amount.to_string(),
        record.quantity.to_string(),
        record.start_count.to_string(),
        record
            .current_count
            .map(|count| count.to_string())
            .unwrap_or_default(),
    ]
}

/// Render records as CSV bytes, BOM first.
pub fn render_csv(records: &[DeficiencyRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(CSV_HEADERS)?;
    for record in records {
        writer.write_record(record_row(record))?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Other(format!("failed to flush CSV buffer: {}", e.error())))
}

/// `{timestamp}_{sanitized}.csv`, suffixed with a counter if the name is already taken in this pass.
fn file_name(timestamp: &str, product_name: &str, taken: &mut HashSet<String>) -> String {
    let base = format!("{timestamp}_{}", sanitize_product_name(product_name));
    let mut name = format!("{base}.csv");
    let mut n = 2;
    while !taken.insert(name.clone()) {
        name = format!("{base}_{n}.csv");
        n += 1;
    }
    name
}

async fn write_file(dir: &Path, name: &str, records: &[DeficiencyRecord]) -> Result<()> {
    let contents = render_csv(records)?;
    let path = dir.join(name);
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| io_error("writing export file", &path, e))
}

#[async_trait]
impl ExportSink for CsvExportSink {
    async fn export(&self, groups: &DeficiencyGroups) -> ExportSummary {
        let mut summary = ExportSummary::default();
        if groups.is_empty() {
            return summary;
        }

        let dir = self.dir.resolve();
        if let Err(e) = ensure_dir_all_with_op("creating export directory", &dir).await {
            error!(dir = %dir.display(), error = %e, "Cannot create export directory");
            summary.failed = groups
                .iter()
                .map(|group| ExportFailure {
                    product_name: group.product_name.clone(),
                    error: e.to_string(),
                })
                .collect();
            return summary;
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let mut taken = HashSet::new();

        for group in groups.iter() {
            let name = file_name(&timestamp, &group.product_name, &mut taken);
            match write_file(&dir, &name, &group.records).await {
                Ok(()) => {
                    info!(
                        file = %name,
                        product = %group.product_name,
                        records = group.records.len(),
                        "Exported deficient orders"
                    );
                    summary.files.push(name);
                }
                Err(e) => {
                    error!(file = %name, product = %group.product_name, error = %e, "Export failed");
                    summary.failed.push(ExportFailure {
                        product_name: group.product_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        summary
    }
}
