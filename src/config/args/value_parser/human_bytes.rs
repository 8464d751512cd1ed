use std::str::FromStr;

use byte_unit::Byte;

const UNDER_MIN_CHUNK_SIZE: &str = "must be greater than or equal to 5MiB";
const OVER_MAX_CHUNK_SIZE: &str = "must be smaller than or equal to 5GiB";

// Multipart part size limits of the S3 API.
const MIN_CHUNK_SIZE: u128 = 5 * 1024 * 1024;
const MAX_CHUNK_SIZE: u128 = 5 * 1024 * 1024 * 1024;

pub fn check_chunk_size(value: &str) -> Result<String, String> {
    let result = Byte::from_str(value).map_err(|e| e.to_string())?;

    if result.as_u128() < MIN_CHUNK_SIZE {
        return Err(UNDER_MIN_CHUNK_SIZE.to_string());
    }
    if result.as_u128() > MAX_CHUNK_SIZE {
        return Err(OVER_MAX_CHUNK_SIZE.to_string());
    }

    Ok(value.to_string())
}

pub fn parse_chunk_size(value: &str) -> Result<u64, String> {
    check_chunk_size(value)?;

    let result = Byte::from_str(value).map_err(|e| e.to_string())?;
    Ok(result.as_u128().try_into().unwrap())
}

pub fn check_human_bytes(value: &str) -> Result<String, String> {
    let result = Byte::from_str(value).map_err(|e| e.to_string())?;
    TryInto::<u64>::try_into(result.as_u128()).map_err(|e| e.to_string())?;

    Ok(value.to_string())
}

pub fn parse_human_bytes(value: &str) -> Result<u64, String> {
    check_human_bytes(value)?;

    let result = Byte::from_str(value).map_err(|e| e.to_string())?;
    Ok(result.as_u128().try_into().unwrap())
}
