use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;

/// 承载待处理图片的 multipart 字段名
pub const FILE_FIELD: &str = "file";

/// 从 multipart 中取出的上传文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// 客户端声明的文件名（可能为空字符串）
    pub file_name: String,
    /// 客户端声明的 Content-Type，仅用于日志
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// 查找名为 `file` 且带 filename 参数的上传字段。
///
/// 没有 filename 参数的同名字段是普通表单值而不是文件，会被跳过；
/// 多个文件字段时取第一个。
pub async fn find_file_field(
    multipart: &mut Multipart,
) -> Result<Option<UploadedFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}
