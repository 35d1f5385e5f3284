use super::*;

use std::{
    env, fs,
    io::Cursor,
    time::{SystemTime, UNIX_EPOCH},
};

use base64::Engine as _;
use shared::error::ErrorCode;

fn result_with(image: Option<String>) -> GenerationResult {
    GenerationResult {
        adversarial_image_encoding: image,
        original_label: "7".to_string(),
        adversarial_label: "1".to_string(),
    }
}

#[test]
fn report_lists_both_predictions() {
    let result = result_with(Some("QUJD".to_string()));
    let status = ConnectivityStatus::Connected("ok".to_string());
    let report = GenerationReport {
        service_status: &status,
        file_name: "seven.png",
        epsilon: PerturbationStrength::default(),
        prediction_changed: result.label_flipped(),
        result: &result,
    };
    let text = report_text(&report);
    assert!(text.contains("Attack strength (epsilon): 0.10"));
    assert!(text.contains("Original prediction: 7"));
    assert!(text.contains("Adversarial prediction: 1"));
    assert!(text.contains("Prediction changed: yes"));

    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["epsilon"], serde_json::json!(0.1));
    assert_eq!(json["result"]["adversarial_label"], "1");
}

#[test]
fn notices_distinguish_failures_from_refusals() {
    assert_eq!(
        notice_text(&Notice::new(ErrorCode::Request, "HTTP error! status: 500")),
        "Error: HTTP error! status: 500"
    );
    assert_eq!(
        notice_text(&Notice::new(ErrorCode::Precondition, "upload an image first")),
        "Note: upload an image first"
    );
    assert_eq!(
        status_line(&ConnectivityStatus::Disconnected),
        "Backend status: Disconnected - start the generation service"
    );
}

#[tokio::test]
async fn writes_decoded_png_and_rejects_non_images() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("fgsm_render_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");

    let digit = image::GrayImage::from_pixel(4, 4, image::Luma([200u8]));
    let mut png = Vec::new();
    digit
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .expect("encode");

    let out = temp_root.join("adversarial.png");
    write_adversarial_image(&result_with(Some(STANDARD.encode(&png))), &out)
        .await
        .expect("write");
    assert_eq!(fs::read(&out).expect("read back"), png);

    let text_payload = result_with(Some("QUJD".to_string()));
    assert!(write_adversarial_image(&text_payload, &temp_root.join("abc.png"))
        .await
        .is_err());
    assert!(write_adversarial_image(&result_with(None), &temp_root.join("none.png"))
        .await
        .is_err());

    fs::remove_dir_all(temp_root).expect("cleanup");
}
