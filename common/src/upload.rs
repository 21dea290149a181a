use crate::reading::Reading;

// The backend expects every field with a fixed number of decimals, e.g.
// voltage=0 must arrive as 0.00. serde_json always shortens float tokens,
// so the body is rendered directly with format! precision instead.
pub fn payload_json(reading: &Reading) -> String {
    format!(
        concat!(
            "{{\"voltage\":{:.2},\"current\":{:.3},\"power\":{:.2},",
            "\"energy\":{:.3},\"frequency\":{:.2},\"power_factor\":{:.3}}}"
        ),
        reading.voltage,
        reading.current,
        reading.power,
        reading.energy,
        reading.frequency,
        reading.power_factor,
    )
}
