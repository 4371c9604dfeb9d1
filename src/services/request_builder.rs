use garde::Validate;
use std::collections::HashSet;
use std::io::Write;

use crate::models::batch::{
    BatchRecord, FileData, GenerateRequest, RequestContent, RequestLine, RequestPart,
    RequestTemplate,
};

/// Build one request line per record. Correlation keys are the only link
/// between a request and its response line, so duplicates are rejected.
pub fn build_request_lines(
    records: &[BatchRecord],
    template: &RequestTemplate,
) -> Result<Vec<RequestLine>, BuildError> {
    template
        .generation_config
        .validate()
        .map_err(|report| BuildError::InvalidConfig(report.to_string()))?;

    let mut seen = HashSet::with_capacity(records.len());
    let mut lines = Vec::with_capacity(records.len());

    for record in records {
        if !seen.insert(record.correlation_key.as_str()) {
            return Err(BuildError::DuplicateKey(record.correlation_key.clone()));
        }

        lines.push(RequestLine {
            custom_id: record.correlation_key.clone(),
            request: GenerateRequest {
                model: template.model.clone(),
                contents: vec![RequestContent {
                    role: "user".to_string(),
                    parts: vec![
                        RequestPart::Text {
                            text: template.instruction.clone(),
                        },
                        RequestPart::File {
                            file_data: FileData {
                                file_uri: record.handle.uri.clone(),
                                mime_type: record.handle.mime_type.clone(),
                            },
                        },
                    ],
                }],
                generation_config: template.generation_config.clone(),
            },
        });
    }

    Ok(lines)
}

/// Write lines as JSONL, one object per line.
pub fn write_request_document<W: Write>(lines: &[RequestLine], mut writer: W) -> Result<(), BuildError> {
    for line in lines {
        serde_json::to_writer(&mut writer, line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Duplicate correlation key: {0}")]
    DuplicateKey(String),

    #[error("Invalid generation config: {0}")]
    InvalidConfig(String),

    #[error("Failed to serialize request line: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write request document: {0}")]
    Io(#[from] std::io::Error),
}
