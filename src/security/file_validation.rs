use std::sync::LazyLock;

pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

static MAGIC_BYTES: LazyLock<Vec<(&'static [u8], &'static str)>> = LazyLock::new(|| {
    vec![
        (&[0xFF, 0xD8, 0xFF], "image/jpeg"),
        (&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], "image/png"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1], "application/x-ole-storage"),
    ]
});

const BLOCKED_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "app", "deb", "rpm", "dmg", "pkg", "msi", "scr", "bat", "cmd",
    "com", "pif", "vbs", "vbe", "js", "jse", "ws", "wsf", "wsc", "wsh", "ps1", "psc1", "msh",
    "scf", "lnk", "inf", "reg", "docm", "dotm", "xlsm", "xltm", "xlam", "pptm", "potm", "ppam",
    "ppsm", "sldm", "jar", "msix", "sh", "csh", "bash", "zsh",
];

#[derive(Debug, Clone)]
pub struct FileValidationConfig {
    pub max_size: usize,
    /// Detected content types accepted for upload. Office documents are zip
    /// or OLE containers and are matched through those.
    pub allowed_types: Vec<String>,
    pub block_executables: bool,
}

impl Default for FileValidationConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: vec![
                "image/jpeg".into(),
                "image/png".into(),
                "image/gif".into(),
                "application/pdf".into(),
                "text/plain".into(),
                "application/zip".into(),
                "application/x-ole-storage".into(),
            ],
            block_executables: true,
        }
    }
}

impl FileValidationConfig {
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FileValidationResult {
    pub is_valid: bool,
    pub detected_type: Option<String>,
    pub errors: Vec<String>,
}

pub fn validate_file_upload(
    filename: &str,
    data: &[u8],
    config: &FileValidationConfig,
) -> FileValidationResult {
    let mut result = FileValidationResult {
        is_valid: true,
        detected_type: None,
        errors: Vec::new(),
    };

    if data.is_empty() {
        result.is_valid = false;
        result.errors.push("File is empty".into());
        return result;
    }

    if data.len() > config.max_size {
        result.is_valid = false;
        result.errors.push(format!(
            "File size {} bytes exceeds maximum allowed size of {} bytes",
            data.len(),
            config.max_size
        ));
    }

    if let Some((_, ext)) = filename.rsplit_once('.') {
        if BLOCKED_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            result.is_valid = false;
            result
                .errors
                .push(format!("File extension .{ext} is blocked for security reasons"));
        }
    }

    match detect_file_type(data) {
        Some(detected) => {
            if !config.allowed_types.is_empty() && !config.allowed_types.contains(&detected) {
                result.is_valid = false;
                result.errors.push(format!(
                    "Detected file type '{detected}' is not in the allowed types list"
                ));
            }
            result.detected_type = Some(detected);
        }
        None => {
            result.is_valid = false;
            result
                .errors
                .push("File type could not be determined".into());
        }
    }

    if config.block_executables && is_potentially_executable(data) {
        result.is_valid = false;
        result.errors.push(
            "File appears to be executable or contains executable code, which is blocked".into(),
        );
    }

    result
}

fn detect_file_type(data: &[u8]) -> Option<String> {
    for (magic, mime_type) in MAGIC_BYTES.iter() {
        if data.starts_with(magic) {
            return Some(mime_type.to_string());
        }
    }

    let text = std::str::from_utf8(data).ok()?;
    if text
        .chars()
        .all(|c| !c.is_control() || c.is_whitespace())
    {
        return Some("text/plain".into());
    }

    None
}

fn is_potentially_executable(data: &[u8]) -> bool {
    if data.starts_with(&[0x4D, 0x5A]) || data.starts_with(&[0x7F, 0x45, 0x4C, 0x46]) {
        return true;
    }

    if data.starts_with(&[0xFE, 0xED, 0xFA, 0xCF]) || data.starts_with(&[0xCF, 0xFA, 0xED, 0xFE]) {
        return true;
    }

    let head = String::from_utf8_lossy(&data[..data.len().min(4096)]).to_lowercase();
    head.starts_with("#!")
}
