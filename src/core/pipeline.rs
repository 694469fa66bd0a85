use crate::core::reshape;
use crate::core::{ConfigProvider, Pipeline, Record, Relay, Storage, TransformResult};
use crate::domain::model::RelayedRow;
use crate::utils::error::{EtlError, Result};

/// Field added to every record with the date the run executed.
const PROCESSING_DATE_FIELD: &str = "processing_date";

/// Trailing output column holding the correlation identifier.
const MESSAGE_ID_COLUMN: &str = "messageid";

pub struct RelayPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    relay: Box<dyn Relay>,
}

impl<S: Storage, C: ConfigProvider> RelayPipeline<S, C> {
    pub fn new(storage: S, config: C, relay: Box<dyn Relay>) -> Self {
        Self {
            storage,
            config,
            relay,
        }
    }

    fn record_from_item(&self, item: &serde_json::Value, index: usize) -> Result<Record> {
        let item = match self.config.rowkey() {
            Some(key) => item.get(key).ok_or_else(|| EtlError::ProcessingError {
                message: format!("record {} has no '{}' key", index, key),
            })?,
            None => item,
        };

        let obj = item.as_object().ok_or_else(|| EtlError::ProcessingError {
            message: format!("record {} is not an object", index),
        })?;

        Ok(Record::from_json_object(obj))
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for RelayPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::debug!("Reading input document: {}", self.config.input_path());
        let bytes = self.storage.read_file(self.config.input_path()).await?;
        let mut document: serde_json::Value = serde_json::from_slice(&bytes)?;

        if let Some(key) = self.config.subset() {
            document = document
                .get_mut(key)
                .map(serde_json::Value::take)
                .ok_or_else(|| EtlError::ProcessingError {
                    message: format!("input document has no '{}' key", key),
                })?;
        }

        let items = document.as_array().ok_or_else(|| EtlError::ProcessingError {
            message: "input document does not hold an array of records".to_string(),
        })?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.record_from_item(item, index))
            .collect()
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let header = self.config.header();
        let timeout = self.config.consume_timeout();
        let mut relayed = Vec::with_capacity(data.len());

        // Strictly sequential: each record completes its broker round trip
        // before the next one starts, so channel order matches input order.
        for (index, mut record) in data.into_iter().enumerate() {
            reshape::rename(
                &mut record,
                self.config.rename_from(),
                self.config.rename_to(),
            )?;
            reshape::split(
                &mut record,
                self.config.split_from(),
                self.config.split_to(),
                self.config.splitters(),
            )?;

            let today = chrono::Local::now().format("%d-%m-%Y").to_string();
            reshape::stamp(&mut record, PROCESSING_DATE_FIELD, &today);

            reshape::retain_header(&mut record, header);
            let row = reshape::project(&record, header)?;

            let published_id = self.relay.publish(&row).await?;
            let (message_id, values) = self.relay.consume_one(timeout).await?;

            if message_id != published_id {
                tracing::warn!(
                    "Record {}: consumed message {} does not match published {}",
                    index,
                    message_id,
                    published_id
                );
            }

            tracing::debug!("Record {} relayed as message {}", index, message_id);
            relayed.push(RelayedRow { values, message_id });
        }

        Ok(TransformResult { relayed })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header: Vec<String> = self.config.header().to_vec();
        header.push(MESSAGE_ID_COLUMN.to_string());
        writer.write_record(&header)?;

        for relayed in &result.relayed {
            let mut row = relayed.values.clone();
            row.push(relayed.message_id.to_string());
            writer.write_record(&row)?;
        }

        writer.flush()?;
        let bytes = writer
            .into_inner()
            .map_err(|e| EtlError::ProcessingError {
                message: format!("failed to finish CSV output: {}", e),
            })?;

        let output_path = self.config.output_path().to_string();
        self.storage.write_file(&output_path, &bytes).await?;

        tracing::debug!("Wrote {} rows to {}", result.relayed.len(), output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::MemoryRelay;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put_file(&self, path: &str, data: &[u8]) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        subset: Option<String>,
        rowkey: Option<String>,
        header: Vec<String>,
        rename_from: Vec<String>,
        rename_to: Vec<String>,
        split_from: Vec<String>,
        split_to: Vec<String>,
        splitters: Vec<String>,
    }

    impl MockConfig {
        fn locations() -> Self {
            Self {
                subset: Some("locations".to_string()),
                rowkey: None,
                header: strings(&["name", "lat", "lon", "processing_date"]),
                rename_from: strings(&["full_name"]),
                rename_to: strings(&["name"]),
                split_from: strings(&["coord"]),
                split_to: strings(&["lat,lon"]),
                splitters: strings(&[","]),
            }
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            "input.json"
        }

        fn output_path(&self) -> &str {
            "output.csv"
        }

        fn subset(&self) -> Option<&str> {
            self.subset.as_deref()
        }

        fn rowkey(&self) -> Option<&str> {
            self.rowkey.as_deref()
        }

        fn header(&self) -> &[String] {
            &self.header
        }

        fn rename_from(&self) -> &[String] {
            &self.rename_from
        }

        fn rename_to(&self) -> &[String] {
            &self.rename_to
        }

        fn split_from(&self) -> &[String] {
            &self.split_from
        }

        fn split_to(&self) -> &[String] {
            &self.split_to
        }

        fn splitters(&self) -> &[String] {
            &self.splitters
        }

        fn consume_timeout(&self) -> Duration {
            Duration::from_millis(500)
        }
    }

    fn pipeline(config: MockConfig) -> (MockStorage, RelayPipeline<MockStorage, MockConfig>) {
        let storage = MockStorage::new();
        let relay = Box::new(MemoryRelay::new("test-channel"));
        let pipeline = RelayPipeline::new(storage.clone(), config, relay);
        (storage, pipeline)
    }

    #[tokio::test]
    async fn test_extract_descends_into_subset() {
        let (storage, pipeline) = pipeline(MockConfig::locations());
        storage
            .put_file(
                "input.json",
                br#"{"locations": [{"full_name": "Jane Doe", "coord": "10,20"}]}"#,
            )
            .await;

        let records = pipeline.extract().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields.get("full_name").unwrap(), "Jane Doe");
        assert_eq!(records[0].fields.get("coord").unwrap(), "10,20");
    }

    #[tokio::test]
    async fn test_extract_applies_rowkey() {
        let mut config = MockConfig::locations();
        config.subset = None;
        config.rowkey = Some("site".to_string());
        let (storage, pipeline) = pipeline(config);
        storage
            .put_file(
                "input.json",
                br#"[{"site": {"full_name": "Jane Doe", "coord": "10,20"}}]"#,
            )
            .await;

        let records = pipeline.extract().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields.get("full_name").unwrap(), "Jane Doe");
    }

    #[tokio::test]
    async fn test_extract_stringifies_scalars() {
        let mut config = MockConfig::locations();
        config.subset = None;
        let (storage, pipeline) = pipeline(config);
        storage
            .put_file("input.json", br#"[{"full_name": "Jane", "coord": 42}]"#)
            .await;

        let records = pipeline.extract().await.unwrap();

        assert_eq!(records[0].fields.get("coord").unwrap(), "42");
    }

    #[tokio::test]
    async fn test_extract_rejects_non_array_document() {
        let (storage, pipeline) = pipeline(MockConfig::locations());
        storage
            .put_file("input.json", br#"{"locations": {"not": "an array"}}"#)
            .await;

        let err = pipeline.extract().await.unwrap_err();

        assert!(matches!(err, EtlError::ProcessingError { .. }));
    }

    #[tokio::test]
    async fn test_extract_rejects_missing_subset_key() {
        let (storage, pipeline) = pipeline(MockConfig::locations());
        storage.put_file("input.json", br#"{"sites": []}"#).await;

        let err = pipeline.extract().await.unwrap_err();

        assert!(matches!(err, EtlError::ProcessingError { .. }));
    }

    #[tokio::test]
    async fn test_transform_reshapes_and_relays() {
        let (_storage, pipeline) = pipeline(MockConfig::locations());
        let mut record = Record::new();
        record
            .fields
            .insert("full_name".to_string(), "Jane Doe".to_string());
        record
            .fields
            .insert("coord".to_string(), "10,20".to_string());
        record
            .fields
            .insert("ignored".to_string(), "x".to_string());

        let result = pipeline.transform(vec![record]).await.unwrap();

        assert_eq!(result.relayed.len(), 1);
        let today = chrono::Local::now().format("%d-%m-%Y").to_string();
        assert_eq!(
            result.relayed[0].values,
            vec!["Jane Doe".to_string(), "10".to_string(), "20".to_string(), today]
        );
    }

    #[tokio::test]
    async fn test_transform_fails_on_missing_rename_source() {
        let (_storage, pipeline) = pipeline(MockConfig::locations());
        let mut record = Record::new();
        record
            .fields
            .insert("coord".to_string(), "10,20".to_string());

        let err = pipeline.transform(vec![record]).await.unwrap_err();

        assert!(matches!(err, EtlError::MissingFieldError { field } if field == "full_name"));
    }

    #[tokio::test]
    async fn test_transform_preserves_input_order() {
        let (_storage, pipeline) = pipeline(MockConfig::locations());
        let mut records = Vec::new();
        for i in 0..3 {
            let mut record = Record::new();
            record
                .fields
                .insert("full_name".to_string(), format!("Person {}", i));
            record
                .fields
                .insert("coord".to_string(), format!("{},{}", i, i + 1));
            records.push(record);
        }

        let result = pipeline.transform(records).await.unwrap();

        let names: Vec<&str> = result
            .relayed
            .iter()
            .map(|r| r.values[0].as_str())
            .collect();
        assert_eq!(names, vec!["Person 0", "Person 1", "Person 2"]);
    }

    #[tokio::test]
    async fn test_load_writes_header_and_message_ids() {
        let (storage, pipeline) = pipeline(MockConfig::locations());
        let message_id = Uuid::new_v4();
        let result = TransformResult {
            relayed: vec![RelayedRow {
                values: strings(&["Jane Doe", "10", "20", "01-08-2026"]),
                message_id,
            }],
        };

        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(output_path, "output.csv");
        let bytes = storage.get_file("output.csv").await.unwrap();
        let content = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "name,lat,lon,processing_date,messageid");
        assert_eq!(
            lines[1],
            format!("Jane Doe,10,20,01-08-2026,{}", message_id)
        );
    }

    #[tokio::test]
    async fn test_load_with_no_rows_writes_header_only() {
        let (storage, pipeline) = pipeline(MockConfig::locations());

        pipeline.load(TransformResult::default()).await.unwrap();

        let bytes = storage.get_file("output.csv").await.unwrap();
        let content = String::from_utf8(bytes).unwrap();
        assert_eq!(content.trim_end(), "name,lat,lon,processing_date,messageid");
    }
}
