//! Storage helpers: directories, YAML config I/O and Parquet sample export.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::error::{OrofacialError, Result};
use crate::landmarks::Point2;
use crate::models::DataPoint;

// ─── Directory helpers ────────────────────────────────────────────────────────

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

// ─── YAML config I/O ─────────────────────────────────────────────────────────

pub fn save_yaml<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let content = serde_yaml::to_string(data)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T>
where
    T: Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)?;
    let val = serde_yaml::from_str(&content)?;
    Ok(val)
}

// ─── Parquet sample I/O ──────────────────────────────────────────────────────

fn data_point_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::Int64, false),
        Field::new("mouthOpening", DataType::Float64, false),
        Field::new("lateralMovement", DataType::Float64, false),
        Field::new("jawX", DataType::Float64, false),
        Field::new("jawY", DataType::Float64, false),
    ]))
}

fn data_points_to_record_batch(points: &[DataPoint]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(
            points.iter().map(|p| p.timestamp as i64).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            points.iter().map(|p| p.mouth_opening).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            points.iter().map(|p| p.lateral_movement).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            points.iter().map(|p| p.jaw_position.x).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            points.iter().map(|p| p.jaw_position.y).collect::<Vec<_>>(),
        )),
    ];
    Ok(RecordBatch::try_new(data_point_schema(), columns)?)
}

/// Write a session's samples to a Parquet file, replacing any existing file.
pub fn write_data_points(path: &Path, points: &[DataPoint]) -> Result<()> {
    let batch = data_points_to_record_batch(points)?;
    let file = fs::File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| OrofacialError::Other(format!("missing or mistyped column '{name}'")))
}

/// Read samples previously written by [`write_data_points`].
pub fn read_data_points(path: &Path) -> Result<Vec<DataPoint>> {
    let file = fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut points = vec![];
    for batch in reader {
        let batch = batch?;
        let ts = column::<Int64Array>(&batch, "timestamp")?;
        let mouth = column::<Float64Array>(&batch, "mouthOpening")?;
        let lateral = column::<Float64Array>(&batch, "lateralMovement")?;
        let jaw_x = column::<Float64Array>(&batch, "jawX")?;
        let jaw_y = column::<Float64Array>(&batch, "jawY")?;
        for i in 0..batch.num_rows() {
            points.push(DataPoint {
                timestamp: ts.value(i).max(0) as u64,
                mouth_opening: mouth.value(i),
                lateral_movement: lateral.value(i),
                jaw_position: Point2 {
                    x: jaw_x.value(i),
                    y: jaw_y.value(i),
                },
            });
        }
    }
    Ok(points)
}
