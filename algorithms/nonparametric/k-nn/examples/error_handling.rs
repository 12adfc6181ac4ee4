//! Example demonstrating error handling with the k-NN classifier.
//!
//! Every misuse of the classifier surfaces as a `KnnError` value instead of a
//! panic: a zero `k`, predicting before training, and asking for more
//! neighbors than there are training points.

use k_nn::{KnnClassifier, KnnError};
use ndarray::array;
use petal_helpers::{DataPoint, L2Dist};

fn main() {
    println!("k-NN Classifier Error Handling Examples");
    println!("=======================================");

    // Example 1: Handle invalid k value
    println!("\n1. Handling invalid k value (k=0):");
    match KnnClassifier::<&str, f64, _>::new(0, L2Dist) {
        Ok(_) => println!("   Classifier created successfully"),
        Err(e @ KnnError::InvalidK) => println!("   ✓ Caught expected error: {}", e),
        Err(e) => println!("   ✗ Unexpected error: {}", e),
    }

    // Example 2: Predict before train
    println!("\n2. Predicting before training:");
    let untrained = KnnClassifier::<&str, f64, _>::new(3, L2Dist).expect("k is positive");
    match untrained.predict(array![1.0, 1.0].view()) {
        Ok(label) => println!("   Predicted label: {}", label),
        Err(e @ KnnError::NotTrained) => println!("   ✓ Caught expected error: {}", e),
        Err(e) => println!("   ✗ Unexpected error: {}", e),
    }

    // Example 3: k larger than the training set
    println!("\n3. Training with fewer points than k:");
    let mut greedy = KnnClassifier::new(5, L2Dist).expect("k is positive");
    let small = vec![
        DataPoint::new(array![1.0, 1.0], "A"),
        DataPoint::new(array![2.0, 2.0], "A"),
    ];
    match greedy.train(small) {
        Ok(()) => println!("   Classifier trained"),
        Err(e @ KnnError::KTooLarge { .. }) => println!("   ✓ Caught expected error: {}", e),
        Err(e) => println!("   ✗ Unexpected error: {}", e),
    }

    // Example 4: Error propagation in a function
    println!("\n4. Error propagation in functions:");

    fn classify_with_error_handling() -> Result<String, KnnError> {
        let training_data = vec![
            DataPoint::new(array![1.0, 1.0], "Class A"),
            DataPoint::new(array![2.0, 2.0], "Class A"),
            DataPoint::new(array![1.0, 2.0], "Class A"),
            DataPoint::new(array![8.0, 8.0], "Class B"),
            DataPoint::new(array![9.0, 8.0], "Class B"),
            DataPoint::new(array![8.0, 9.0], "Class B"),
        ];

        let mut classifier = KnnClassifier::new(3, L2Dist)?;
        classifier.train(training_data)?;
        let result = classifier.predict(array![7.5, 8.5].view())?;
        Ok(result.to_string())
    }

    match classify_with_error_handling() {
        Ok(result) => println!("   ✓ Classification result: {}", result),
        Err(e) => println!("   ✗ Classification failed: {}", e),
    }
}
