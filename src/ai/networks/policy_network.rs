use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Feed-forward scorer shared by the learned and reinforcement strategies.
///
/// ```text
/// Input:  [batch, feature_len]
/// FC1:    feature_len -> 256, ReLU, Dropout
/// FC2:    256 -> 128, ReLU, Dropout
/// FC3:    128 -> 64, ReLU
/// Head:   64 -> action_slots  (one score / Q-value per slot)
/// ```
#[derive(Module, Debug)]
pub struct PolicyNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    head: Linear<B>,
    dropout: Dropout,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct PolicyNetworkConfig {
    pub input_len: usize,
    pub output_len: usize,
    #[config(default = 256)]
    pub hidden1: usize,
    #[config(default = 128)]
    pub hidden2: usize,
    #[config(default = 64)]
    pub hidden3: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl PolicyNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyNetwork<B> {
        PolicyNetwork {
            fc1: LinearConfig::new(self.input_len, self.hidden1).init(device),
            fc2: LinearConfig::new(self.hidden1, self.hidden2).init(device),
            fc3: LinearConfig::new(self.hidden2, self.hidden3).init(device),
            head: LinearConfig::new(self.hidden3, self.output_len).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> PolicyNetwork<B> {
    /// Forward pass: input [batch, feature_len] -> output [batch, action_slots].
    /// Dropout only acts on autodiff backends.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.dropout.forward(self.relu.forward(self.fc1.forward(input)));
        let x = self.dropout.forward(self.relu.forward(self.fc2.forward(x)));
        let x = self.relu.forward(self.fc3.forward(x));
        self.head.forward(x)
    }
}

/// Serializable description of a [`PolicyNetwork`], recorded next to saved
/// weights so an artifact can be rebuilt and checked against the board size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkArchitecture {
    pub input_len: usize,
    pub output_len: usize,
    pub hidden: [usize; 3],
    pub dropout: f64,
}

impl NetworkArchitecture {
    pub fn new(input_len: usize, output_len: usize) -> Self {
        NetworkArchitecture {
            input_len,
            output_len,
            hidden: [256, 128, 64],
            dropout: 0.2,
        }
    }

    pub fn with_hidden(mut self, hidden: [usize; 3]) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn config(&self) -> PolicyNetworkConfig {
        PolicyNetworkConfig::new(self.input_len, self.output_len)
            .with_hidden1(self.hidden[0])
            .with_hidden2(self.hidden[1])
            .with_hidden3(self.hidden[2])
            .with_dropout(self.dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyNetwork<B> {
        self.config().init(device)
    }
}
