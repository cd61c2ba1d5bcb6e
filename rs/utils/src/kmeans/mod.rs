pub mod codebook;
pub mod kmeans;
pub mod seeding;
