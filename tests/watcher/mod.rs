mod classifier_test;
