use super::*;
use crate::test_support::{sample_image, MissingGenerationService};

#[test]
fn base_url_gains_trailing_slash_and_joins_endpoints() {
    let service = HttpGenerationService::new("http://localhost:8000").expect("service");
    assert_eq!(service.base_url().as_str(), "http://localhost:8000/");
    assert_eq!(
        service.endpoint(GENERATE_PATH).expect("endpoint").as_str(),
        "http://localhost:8000/generate-adversarial/"
    );
    assert_eq!(
        service.endpoint(LIVENESS_PATH).expect("endpoint").as_str(),
        "http://localhost:8000/"
    );
}

#[test]
fn base_url_path_prefix_is_preserved() {
    let service = HttpGenerationService::new(" https://example.test/fgsm ").expect("service");
    assert_eq!(
        service.endpoint(GENERATE_PATH).expect("endpoint").as_str(),
        "https://example.test/fgsm/generate-adversarial/"
    );
}

#[test]
fn rejects_unusable_base_urls() {
    assert!(HttpGenerationService::new("not a url").is_err());
    assert!(HttpGenerationService::new("ftp://example.test").is_err());
}

#[test]
fn request_carries_image_and_wire_epsilon() {
    let image = sample_image();
    let strength = PerturbationStrength::from_f64(0.07).expect("strength");
    let request = GenerationRequest::new(&image, strength);
    assert_eq!(request.file_name, "seven.png");
    assert_eq!(request.mime_type, "image/png");
    assert_eq!(request.image_bytes, image.raw_bytes());
    assert_eq!(request.epsilon, "0.07");
}

#[tokio::test]
async fn missing_service_fails_both_calls() {
    let service = MissingGenerationService;
    assert!(service.liveness().await.is_err());
    let err = service
        .generate_adversarial(GenerationRequest::new(
            &sample_image(),
            PerturbationStrength::default(),
        ))
        .await
        .expect_err("must fail");
    assert_eq!(err.code(), shared::error::ErrorCode::Request);
}
