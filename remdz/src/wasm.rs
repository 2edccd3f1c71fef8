use wasm_bindgen::prelude::*;

fn to_js_err(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", e))
}

/// Encode audio file bytes to the final `.npz` record
///
/// `block_size` and `window` fall back to 512 and sine when omitted.
#[wasm_bindgen]
pub fn encode_audio_to_npz(
    audio_bytes: &[u8],
    block_size: Option<usize>,
    window: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    let mut codec = crate::CodecConfig::default();
    if let Some(n) = block_size {
        codec.block_size = n;
    }
    if let Some(w) = window {
        codec.window = w.parse().map_err(|e: libmdz::Error| JsValue::from_str(&e.to_string()))?;
    }

    let options = crate::EncodeOptions::new().with_codec(codec);
    let output = crate::encode_from_audio(audio_bytes, &options, |_| {}).map_err(to_js_err)?;

    let record = output
        .final_record()
        .ok_or_else(|| JsValue::from_str("Encoder produced no record"))?;
    libmdz::Writer::new()
        .to_bytes(record)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn decode_npz_to_wav(npz_bytes: &[u8], window: Option<String>) -> Result<Vec<u8>, JsValue> {
    let window = match window {
        Some(w) => w.parse().map_err(|e: libmdz::Error| JsValue::from_str(&e.to_string()))?,
        None => crate::WindowType::Sine,
    };
    crate::decode_to_wav(npz_bytes, window).map_err(to_js_err)
}

/// Record details as a plain JS object
#[wasm_bindgen]
pub fn npz_info(npz_bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = crate::get_record_info(npz_bytes).map_err(to_js_err)?;
    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Decode an `.npz` record to `{ samples, sampleRate, channels }`
#[wasm_bindgen]
pub fn decode_npz_to_samples(npz_bytes: &[u8]) -> Result<JsValue, JsValue> {
    let waveform =
        crate::decode_to_samples(npz_bytes, crate::WindowType::Sine).map_err(to_js_err)?;
    let samples: Vec<f32> = waveform.samples.iter().map(|&s| s as f32).collect();

    let obj = js_sys::Object::new();
    js_sys::Reflect::set(
        &obj,
        &JsValue::from_str("samples"),
        &js_sys::Float32Array::from(&samples[..]).into(),
    )?;
    js_sys::Reflect::set(
        &obj,
        &JsValue::from_str("sampleRate"),
        &JsValue::from_f64(waveform.sample_rate as f64),
    )?;
    js_sys::Reflect::set(
        &obj,
        &JsValue::from_str("channels"),
        &JsValue::from_f64(waveform.channels as f64),
    )?;
    Ok(obj.into())
}

// Initialize wasm-bindgen panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}
